use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of detection classes the upstream device reports.
///
/// Helmet, goggle and vest are required equipment; an unauthorized labourer
/// is an exclusion condition, not a requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Item {
    Helmet,
    Goggle,
    Vest,
    UnauthorizedLabourer,
}

impl Item {
    pub const ALL: [Item; 4] = [
        Item::Helmet,
        Item::Goggle,
        Item::Vest,
        Item::UnauthorizedLabourer,
    ];

    /// The items whose absence triggers the missing-equipment alert.
    pub const MONITORED: [Item; 3] = [Item::Helmet, Item::Goggle, Item::Vest];

    pub fn label(self) -> &'static str {
        match self {
            Item::Helmet => "Helmet",
            Item::Goggle => "Goggle",
            Item::Vest => "Vest",
            Item::UnauthorizedLabourer => "Unauthorized Labourer",
        }
    }

    /// Lowercase form matched against incoming lines.
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Item::Helmet => "helmet",
            Item::Goggle => "goggle",
            Item::Vest => "vest",
            Item::UnauthorizedLabourer => "unauthorized labourer",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Item::Helmet => 0,
            Item::Goggle => 1,
            Item::Vest => 2,
            Item::UnauthorizedLabourer => 3,
        }
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Presence of every item at a single point in time, derived once per
/// processed line and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub helmet: bool,
    pub goggle: bool,
    pub vest: bool,
    pub unauthorized_labourer: bool,
}

impl Snapshot {
    pub(crate) fn from_fn(present: impl Fn(Item) -> bool) -> Self {
        Self {
            helmet: present(Item::Helmet),
            goggle: present(Item::Goggle),
            vest: present(Item::Vest),
            unauthorized_labourer: present(Item::UnauthorizedLabourer),
        }
    }

    pub fn is_present(&self, item: Item) -> bool {
        match item {
            Item::Helmet => self.helmet,
            Item::Goggle => self.goggle,
            Item::Vest => self.vest,
            Item::UnauthorizedLabourer => self.unauthorized_labourer,
        }
    }

    pub fn missing_monitored(&self) -> Vec<Item> {
        Item::MONITORED
            .into_iter()
            .filter(|item| !self.is_present(*item))
            .collect()
    }

    pub fn any_monitored_present(&self) -> bool {
        Item::MONITORED.into_iter().any(|item| self.is_present(item))
    }

    pub fn all_monitored_present(&self) -> bool {
        Item::MONITORED.into_iter().all(|item| self.is_present(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_monitored_excludes_unauthorized() {
        let snapshot = Snapshot::from_fn(|_| false);
        assert_eq!(
            snapshot.missing_monitored(),
            vec![Item::Helmet, Item::Goggle, Item::Vest]
        );
    }

    #[test]
    fn unauthorized_presence_does_not_count_as_equipment() {
        let snapshot = Snapshot::from_fn(|item| item == Item::UnauthorizedLabourer);
        assert!(!snapshot.any_monitored_present());
        assert!(snapshot.is_present(Item::UnauthorizedLabourer));
    }

    #[test]
    fn all_monitored_present_ignores_unauthorized() {
        let snapshot = Snapshot::from_fn(|item| item != Item::UnauthorizedLabourer);
        assert!(snapshot.all_monitored_present());
    }
}
