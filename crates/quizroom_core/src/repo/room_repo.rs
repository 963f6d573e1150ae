//! Room-specific repository queries.

use crate::model::room::{normalize_join_code, Room, RoomSchema};
use crate::repo::repository::{RepoResult, Repository};
use crate::store::{DocumentFilter, DocumentStore};

pub type RoomRepository<St> = Repository<RoomSchema, St>;

impl<St: DocumentStore> Repository<RoomSchema, St> {
    /// Finds the active room players can join with `code`.
    ///
    /// The code is matched case-insensitively; inactive rooms are ignored.
    pub fn find_active_by_code(&self, code: &str) -> RepoResult<Option<Room>> {
        let filter = DocumentFilter::new()
            .field_eq("code", normalize_join_code(code))
            .field_eq("is_active", true)
            .limit(1);
        Ok(self.list(&filter)?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::RoomRepository;
    use crate::model::room::{Room, RoomSchema};
    use crate::repo::repository::RepositoryConfig;
    use crate::store::MemoryDocumentStore;

    #[test]
    fn find_active_by_code_skips_inactive_rooms() {
        let repo = RoomRepository::new(
            RepositoryConfig::new("rooms"),
            RoomSchema,
            MemoryDocumentStore::new(),
        );
        let mut closed = Room::new(1, "ABCD", 42, 1);
        closed.is_active = false;
        repo.create(&closed).unwrap();
        repo.create(&Room::new(2, "ABCD", 42, 1)).unwrap();

        let found = repo.find_active_by_code(" abcd ").unwrap().unwrap();
        assert_eq!(found.id, 2);
        assert!(repo.find_active_by_code("ZZZZ").unwrap().is_none());
    }
}
