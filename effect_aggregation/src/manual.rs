/*!

This is the long-form manual for `effect_aggregation` and the `werksessie`
driver.

## The workshop flow

A "Brede Welvaart" workshop runs in stages:

1. Participants submit free-text *effects* of an intervention on a fixed set
   of life domains (Welzijn, Gezondheid, Wonen, ...). Every effect carries a
   strength score on a bounded scale and a polarity: +1 for a positive
   effect, -1 for a negative one.
2. Participants pick a team. The voting stage compares only the submissions
   of one team.
3. The submissions are deduplicated into *effect groups*: clusters of texts
   judged similar enough to describe the same effect, so nobody votes twice
   on the same idea phrased slightly differently. Participants spend a
   limited budget of upvotes and downvotes on the groups of other authors.
4. Each team answers qualitative questions about its highest-voted groups
   per polarity (who is affected, where, how far the effect reaches, when it
   becomes visible, which adjustments would help).
5. A written report summarizes scores per domain, the top-voted effects and
   the collected feedback.

This crate implements step 3 and the selection for step 4. Everything around
it (the hosted store, team resolution, the report) lives in the `werksessie`
binary.

## Grouping

Submissions are clustered one domain at a time, in input order. The first
unassigned item opens a group; every later unassigned item of the same
domain joins that group when its text is similar enough *to the group's seed
text*. Members are never compared against each other, only against the seed,
so similarity does not chain: when a~b and b~c but not a~c, the seed a
collects b and leaves c to open its own group. This matches the behavior the
workshop tooling always had and is covered by a regression test.

Group identifiers are derived from the session code, the team code, the
domain slug and the cluster index, e.g. `code123_3_gezondheid_0`. They are
deterministic for a given input order; callers sort submissions by creation
time and row identifier before clustering so the identifiers, and the votes
recorded against them, do not shift between reads.

## Similarity metrics

Two metrics exist. A deployment picks exactly one; they produce different
clusters on the same input and are never blended.

* `SequenceRatio` (the default, threshold 0.6): the longest-matching-blocks
  ratio between the normalized texts, in [0, 1]. Identical texts score 1.0.
* `SharedWords` (minimum 5): the number of distinct lowercase words the two
  normalized texts share.

## Polarity

A group's polarity is resolved in two stages. First, every distinct
normalized text gets the majority polarity of its submissions. Second, the
group takes the majority over its member texts' first-stage results. A tie
at either stage resolves to 0 ("contested"); groups with polarity 0 are
excluded from the ranked top-N lists and surfaced separately for manual
review.

## Votes

A vote event is an append-only record of +1 or -1 against a group
identifier. The tally of a group is always the sum over the full event list,
recomputed at read time. Budget enforcement (10 upvotes, 5 downvotes per
participant) and the self-vote prohibition are the caller's responsibility;
see the session context in the `werksessie` binary.

 */
