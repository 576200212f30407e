use crate::error::{Rc4GitError, Result};
use std::fmt;

const COMMUNITY_SUFFIX: &str = "_community";

/// Room identity derived once from a navigation path such as `/channel/org_repo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomId {
    path: String,
    name: String,
}

impl RoomId {
    pub fn from_path(path: &str) -> Result<Self> {
        let name = path
            .split('/')
            .nth(2)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Rc4GitError::InvalidRoom(path.to_string()))?;
        Ok(Self {
            path: path.to_string(),
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// `org_repo` -> `org/repo`. Only the first underscore separates owner from repo.
    pub fn repo_slug(&self) -> String {
        self.name.replacen('_', "/", 1)
    }

    pub fn is_community(&self) -> bool {
        self.name.ends_with(COMMUNITY_SUFFIX)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

pub fn community_room_name(owner: &str) -> String {
    format!("{owner}{COMMUNITY_SUFFIX}")
}

pub fn channel_room_name(owner: &str, repo: &str) -> String {
    format!("{owner}_{repo}")
}

/// Owner part of a `<owner>_community` room name.
pub fn community_owner(room_name: &str) -> Option<&str> {
    room_name.strip_suffix(COMMUNITY_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_segment_is_the_room() {
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        assert_eq!(room.name(), "org_repo");
        assert_eq!(room.path(), "/channel/org_repo");
        assert_eq!(room.repo_slug(), "org/repo");
    }

    #[test]
    fn trailing_segments_are_ignored() {
        let room = RoomId::from_path("/group/acme_widgets/thread").unwrap();
        assert_eq!(room.name(), "acme_widgets");
    }

    #[test]
    fn repo_slug_keeps_later_underscores() {
        let room = RoomId::from_path("/channel/acme_my_repo").unwrap();
        assert_eq!(room.repo_slug(), "acme/my_repo");
    }

    #[test]
    fn rejects_paths_without_room() {
        assert!(RoomId::from_path("/channel").is_err());
        assert!(RoomId::from_path("/channel/").is_err());
        assert!(RoomId::from_path("").is_err());
    }

    #[test]
    fn community_names() {
        assert_eq!(community_room_name("acme"), "acme_community");
        assert_eq!(community_owner("acme_community"), Some("acme"));
        assert_eq!(community_owner("acme_widgets"), None);
        assert!(RoomId::from_path("/channel/acme_community").unwrap().is_community());
    }
}
