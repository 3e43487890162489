use crate::types::Identity;
use std::collections::HashMap;

/// Union-find over identities, stored as a flat child -> parent map.
///
/// An identity missing from the map is its own root. No rank balancing:
/// sessions hold tens of players at most.
#[derive(Debug, Clone, Default)]
pub struct Teams {
    parent: HashMap<Identity, Identity>,
}

impl Teams {
    /// Root of `id`'s team, compressing the path on the way
    pub fn find(&mut self, id: &str) -> Identity {
        let mut root = id.to_string();
        while let Some(parent) = self.parent.get(&root) {
            if *parent == root {
                break;
            }
            root = parent.clone();
        }

        let mut node = id.to_string();
        while node != root {
            match self.parent.insert(node.clone(), root.clone()) {
                Some(next) => node = next,
                None => break,
            }
        }
        root
    }

    /// Merge `loser`'s team into `winner`'s. The winner's root becomes the parent.
    pub fn union(&mut self, winner: &str, loser: &str) {
        let winner_root = self.find(winner);
        let loser_root = self.find(loser);
        if winner_root != loser_root {
            self.parent.insert(loser_root, winner_root);
        }
    }

    /// Forget an identity. Anyone whose parent it was is re-pointed at its
    /// parent, or becomes a root if it was one.
    pub fn remove(&mut self, id: &str) {
        let parent = self.parent.remove(id).filter(|p| p != id);
        let children: Vec<Identity> = self
            .parent
            .iter()
            .filter(|(_, p)| p.as_str() == id)
            .map(|(c, _)| c.clone())
            .collect();

        let new_parent = match parent {
            Some(p) => p,
            None => match children.first() {
                Some(first) => first.clone(),
                None => return,
            },
        };
        for child in children {
            if child == new_parent {
                self.parent.remove(&child);
            } else {
                self.parent.insert(child, new_parent.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.parent.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singletons_are_their_own_root() {
        let mut teams = Teams::default();
        assert_eq!(teams.find("alice"), "alice");
    }

    #[test]
    fn test_union_roots_at_winner() {
        let mut teams = Teams::default();
        teams.union("alice", "bob");
        assert_eq!(teams.find("bob"), "alice");
        assert_eq!(teams.find("alice"), "alice");
    }

    #[test]
    fn test_membership_is_transitive() {
        let mut teams = Teams::default();
        teams.union("alice", "bob");
        teams.union("bob", "carol");
        assert_eq!(teams.find("carol"), "alice");

        // Later the root itself is absorbed by someone else
        teams.union("dave", "alice");
        assert_eq!(teams.find("alice"), "dave");
        assert_eq!(teams.find("bob"), "dave");
        assert_eq!(teams.find("carol"), "dave");
    }

    #[test]
    fn test_union_within_team_is_noop() {
        let mut teams = Teams::default();
        teams.union("alice", "bob");
        teams.union("bob", "alice");
        assert_eq!(teams.find("alice"), "alice");
        assert_eq!(teams.find("bob"), "alice");
    }

    #[test]
    fn test_remove_leaf() {
        let mut teams = Teams::default();
        teams.union("alice", "bob");
        teams.remove("bob");
        assert_eq!(teams.find("bob"), "bob");
        assert_eq!(teams.find("alice"), "alice");
    }

    #[test]
    fn test_remove_root_promotes_a_member() {
        let mut teams = Teams::default();
        teams.union("alice", "bob");
        teams.union("alice", "carol");
        teams.remove("alice");

        let bob_root = teams.find("bob");
        assert_eq!(bob_root, teams.find("carol"));
        assert_ne!(bob_root, "alice");
    }

    #[test]
    fn test_remove_middle_keeps_chain() {
        let mut teams = Teams::default();
        teams.union("bob", "carol");
        teams.union("alice", "bob");
        // carol -> bob -> alice, uncompressed
        teams.remove("bob");
        assert_eq!(teams.find("carol"), "alice");
    }
}
