//! Quiz-specific repository queries.

use crate::model::quiz::{QuizSchema, QuizTitle};
use crate::model::EntityId;
use crate::repo::repository::{RepoResult, Repository};
use crate::store::{DocumentFilter, DocumentStore};

pub type QuizRepository<St> = Repository<QuizSchema, St>;

impl<St: DocumentStore> Repository<QuizSchema, St> {
    /// Identity and title of every quiz owned by `owner`, ordered by identity.
    pub fn titles_by_owner(&self, owner: EntityId) -> RepoResult<Vec<QuizTitle>> {
        let filter = DocumentFilter::new().field_eq("owner", owner);
        Ok(self.list(&filter)?.iter().map(QuizTitle::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::QuizRepository;
    use crate::model::quiz::{Quiz, QuizSchema, QuizTitle};
    use crate::repo::repository::RepositoryConfig;
    use crate::store::MemoryDocumentStore;

    #[test]
    fn titles_by_owner_only_returns_owned_quizzes() {
        let repo = QuizRepository::new(
            RepositoryConfig::new("quizzes"),
            QuizSchema,
            MemoryDocumentStore::new(),
        );
        repo.create(&Quiz::new(2, 42, "Rivers")).unwrap();
        repo.create(&Quiz::new(1, 42, "Capitals")).unwrap();
        repo.create(&Quiz::new(3, 7, "Not mine")).unwrap();

        assert_eq!(
            repo.titles_by_owner(42).unwrap(),
            vec![
                QuizTitle {
                    id: 1,
                    title: "Capitals".to_string()
                },
                QuizTitle {
                    id: 2,
                    title: "Rivers".to_string()
                },
            ]
        );
        assert!(repo.titles_by_owner(99).unwrap().is_empty());
    }
}
