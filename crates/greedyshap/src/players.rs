//! Players and coalitions.
//!
//! A [`PlayerSet`] is an immutable ordered collection of players, each owning
//! one or more input columns. Player indices are stable for the lifetime of
//! the set, and their declaration order is the tie-break order used by the
//! greedy selector. A [`Coalition`] is a fixed-width bitmask over that index
//! space.

use std::collections::HashSet;

use crate::error::ConfigError;

/// Index of a player inside its [`PlayerSet`].
pub type PlayerId = usize;

/// Largest player count accepted by exact enumeration (2^20 coalitions).
pub const MAX_EXACT_PLAYERS: usize = 20;

/// Default feature names: `F0, F1, ...`.
pub fn default_feature_names(n_features: usize) -> Vec<String> {
    (0..n_features).map(|i| format!("F{i}")).collect()
}

/// Resolve user-supplied feature names against the input dimensionality.
pub fn resolve_feature_names(
    names: Option<&[String]>,
    n_features: usize,
) -> Result<Vec<String>, ConfigError> {
    match names {
        None => Ok(default_feature_names(n_features)),
        Some(names) if names.len() != n_features => Err(ConfigError::FeatureNamesLen {
            expected: n_features,
            actual: names.len(),
        }),
        Some(names) => Ok(names.to_vec()),
    }
}

// =============================================================================
// GroupPartition
// =============================================================================

/// User-declared named groups of input columns.
///
/// Groups need not cover every input: unassigned inputs become singleton
/// players when a [`PlayerSet`] is built from the partition.
///
/// # Example
///
/// ```
/// use greedyshap::players::GroupPartition;
///
/// let partition = GroupPartition::new()
///     .with_group("income", [0, 1, 2])
///     .with_group("age", [3]);
/// assert_eq!(partition.groups().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupPartition {
    groups: Vec<(String, Vec<usize>)>,
}

impl GroupPartition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a group. Order of declaration is preserved.
    pub fn with_group(mut self, name: impl Into<String>, inputs: impl IntoIterator<Item = usize>) -> Self {
        self.groups.push((name.into(), inputs.into_iter().collect()));
        self
    }

    pub fn groups(&self) -> &[(String, Vec<usize>)] {
        &self.groups
    }
}

impl<S: Into<String>> FromIterator<(S, Vec<usize>)> for GroupPartition {
    fn from_iter<T: IntoIterator<Item = (S, Vec<usize>)>>(iter: T) -> Self {
        Self {
            groups: iter.into_iter().map(|(name, inputs)| (name.into(), inputs)).collect(),
        }
    }
}

// =============================================================================
// PlayerSet
// =============================================================================

/// One unit of attribution: a named set of input columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    name: String,
    inputs: Vec<usize>,
}

impl Player {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Input columns owned by this player, ascending.
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }
}

/// Immutable ordered partition of the input columns into players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerSet {
    players: Vec<Player>,
    /// `owner[input]` = player owning that input.
    owner: Vec<PlayerId>,
}

impl PlayerSet {
    /// One player per input column, named after `feature_names`.
    pub fn features(feature_names: &[String]) -> Self {
        let players = feature_names
            .iter()
            .enumerate()
            .map(|(input, name)| Player {
                name: name.clone(),
                inputs: vec![input],
            })
            .collect();
        Self {
            players,
            owner: (0..feature_names.len()).collect(),
        }
    }

    /// Players from a group partition.
    ///
    /// Declared groups come first in declaration order, followed by every
    /// unassigned input as a singleton named after its feature.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for empty groups, out-of-range inputs, inputs
    /// claimed by two groups, or duplicate player names.
    pub fn grouped(feature_names: &[String], partition: &GroupPartition) -> Result<Self, ConfigError> {
        let n_inputs = feature_names.len();
        let mut owner: Vec<Option<PlayerId>> = vec![None; n_inputs];
        let mut players = Vec::with_capacity(partition.groups().len());

        for (name, inputs) in partition.groups() {
            if inputs.is_empty() {
                return Err(ConfigError::EmptyGroup(name.clone()));
            }
            let id = players.len();
            let mut members = Vec::with_capacity(inputs.len());
            for &input in inputs {
                if input >= n_inputs {
                    return Err(ConfigError::InputOutOfRange {
                        group: name.clone(),
                        input,
                        n_inputs,
                    });
                }
                match owner[input] {
                    // Repeating an input inside the same group is harmless.
                    Some(prev) if prev == id => continue,
                    Some(prev) => {
                        let first: &Player = &players[prev];
                        return Err(ConfigError::OverlappingGroups {
                            input,
                            first: first.name.clone(),
                            second: name.clone(),
                        });
                    }
                    None => {
                        owner[input] = Some(id);
                        members.push(input);
                    }
                }
            }
            members.sort_unstable();
            players.push(Player {
                name: name.clone(),
                inputs: members,
            });
        }

        for input in 0..n_inputs {
            if owner[input].is_none() {
                owner[input] = Some(players.len());
                players.push(Player {
                    name: feature_names[input].clone(),
                    inputs: vec![input],
                });
            }
        }

        let mut seen = HashSet::with_capacity(players.len());
        for player in &players {
            if !seen.insert(player.name.as_str()) {
                return Err(ConfigError::DuplicateName(player.name.clone()));
            }
        }

        Ok(Self {
            players,
            owner: owner.into_iter().flatten().collect(),
        })
    }

    /// Number of players.
    #[inline]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Number of input columns covered by the set.
    #[inline]
    pub fn n_inputs(&self) -> usize {
        self.owner.len()
    }

    #[inline]
    pub fn player(&self, id: PlayerId) -> &Player {
        &self.players[id]
    }

    #[inline]
    pub fn name(&self, id: PlayerId) -> &str {
        &self.players[id].name
    }

    /// Player owning input column `input`.
    #[inline]
    pub fn owner_of(&self, input: usize) -> PlayerId {
        self.owner[input]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.players.iter().map(|p| p.name.clone()).collect()
    }
}

// =============================================================================
// Coalition
// =============================================================================

/// A subset of players as a bitmask over player indices.
///
/// Only valid for player sets of at most [`MAX_EXACT_PLAYERS`] players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Coalition(u32);

impl Coalition {
    pub const EMPTY: Coalition = Coalition(0);

    /// Coalition of all `n` players.
    #[inline]
    pub fn full(n: usize) -> Self {
        debug_assert!(n <= MAX_EXACT_PLAYERS);
        Coalition(((1u64 << n) - 1) as u32)
    }

    #[inline]
    pub fn from_bits(bits: u32) -> Self {
        Coalition(bits)
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Mask bit for `player`; zero for indices past the mask width.
    #[inline]
    fn bit(player: PlayerId) -> u32 {
        u32::try_from(player).ok().and_then(|p| 1u32.checked_shl(p)).unwrap_or(0)
    }

    #[inline]
    pub fn contains(self, player: PlayerId) -> bool {
        self.0 & Self::bit(player) != 0
    }

    /// Add `player`. Indices past the mask width leave the coalition unchanged.
    #[inline]
    pub fn with(self, player: PlayerId) -> Self {
        Coalition(self.0 | Self::bit(player))
    }

    #[inline]
    pub fn without(self, player: PlayerId) -> Self {
        Coalition(self.0 & !Self::bit(player))
    }

    /// Number of players in the coalition.
    #[inline]
    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Highest member index plus one (0 for the empty coalition).
    #[inline]
    pub fn span(self) -> usize {
        32 - self.0.leading_zeros() as usize
    }

    /// Member player indices, ascending.
    pub fn iter(self) -> impl Iterator<Item = PlayerId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let idx = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(idx)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        default_feature_names(n)
    }

    #[test]
    fn default_names() {
        assert_eq!(default_feature_names(3), vec!["F0", "F1", "F2"]);
    }

    #[test]
    fn resolve_names_checks_length() {
        let supplied = vec!["a".to_string()];
        assert_eq!(
            resolve_feature_names(Some(&supplied), 2),
            Err(ConfigError::FeatureNamesLen { expected: 2, actual: 1 })
        );
        assert_eq!(resolve_feature_names(None, 2).unwrap(), names(2));
    }

    #[test]
    fn feature_players_are_singletons() {
        let set = PlayerSet::features(&names(3));
        assert_eq!(set.len(), 3);
        assert_eq!(set.player(1).inputs(), &[1]);
        assert_eq!(set.owner_of(2), 2);
    }

    #[test]
    fn grouped_fills_unassigned_inputs() {
        let partition = GroupPartition::new().with_group("pair", [3, 1]);
        let set = PlayerSet::grouped(&names(4), &partition).unwrap();

        assert_eq!(set.names(), vec!["pair", "F0", "F2"]);
        assert_eq!(set.player(0).inputs(), &[1, 3]);
        assert_eq!(set.owner_of(3), 0);
        assert_eq!(set.owner_of(2), 2);
        assert_eq!(set.n_inputs(), 4);
    }

    #[test]
    fn grouped_rejects_overlap() {
        let partition = GroupPartition::new()
            .with_group("a", [0, 1])
            .with_group("b", [1, 2]);
        let err = PlayerSet::grouped(&names(3), &partition).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OverlappingGroups {
                input: 1,
                first: "a".into(),
                second: "b".into()
            }
        );
    }

    #[test]
    fn grouped_rejects_bad_groups() {
        let out_of_range = GroupPartition::new().with_group("a", [5]);
        assert!(matches!(
            PlayerSet::grouped(&names(3), &out_of_range),
            Err(ConfigError::InputOutOfRange { input: 5, .. })
        ));

        let empty = GroupPartition::new().with_group("a", []);
        assert_eq!(
            PlayerSet::grouped(&names(3), &empty),
            Err(ConfigError::EmptyGroup("a".into()))
        );

        let clash = GroupPartition::new().with_group("F2", [0]);
        assert_eq!(
            PlayerSet::grouped(&names(3), &clash),
            Err(ConfigError::DuplicateName("F2".into()))
        );
    }

    #[test]
    fn coalition_ops() {
        let c = Coalition::EMPTY.with(0).with(3);
        assert!(c.contains(3));
        assert!(!c.contains(1));
        assert_eq!(c.len(), 2);
        assert_eq!(c.iter().collect::<Vec<_>>(), vec![0, 3]);
        assert_eq!(c.without(3), Coalition::from_bits(1));
        assert_eq!(c.span(), 4);
        assert_eq!(Coalition::full(4).bits(), 0b1111);
        assert_eq!(Coalition::full(MAX_EXACT_PLAYERS).len(), MAX_EXACT_PLAYERS);
    }

    #[test]
    fn coalition_ignores_indices_past_mask_width() {
        let c = Coalition::EMPTY.with(31);
        assert!(c.contains(31));
        for player in [32, 40, usize::MAX] {
            assert_eq!(c.with(player), c);
            assert_eq!(c.without(player), c);
            assert!(!c.contains(player));
        }
    }
}
