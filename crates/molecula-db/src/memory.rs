//! In-process store backend.
//!
//! All tables live behind a single [`RwLock`]. Every write, cascades
//! included, runs under one write guard, so readers never observe a
//! half-applied change. Tables are keyed by UUID v7 IDs, which makes
//! `BTreeMap` iteration order equal to creation order.

use std::collections::BTreeMap;
use std::sync::Arc;

use molecula_types::{
    Molecule, MoleculeId, Prediction, PredictionId, QueryLog, QueryLogId, QueryStatus, User,
    UserId,
};
use tokio::sync::RwLock;

use crate::error::DbError;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    molecules: BTreeMap<MoleculeId, Molecule>,
    predictions: BTreeMap<PredictionId, Prediction>,
    query_logs: BTreeMap<QueryLogId, QueryLog>,
}

/// Shared handle to the in-memory tables. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------

    /// Insert a user; username and token must be unique.
    pub async fn insert_user(&self, user: &User) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username || u.api_token == user.api_token)
        {
            return Err(DbError::Constraint(format!(
                "user {} conflicts with an existing username or token",
                user.username
            )));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    /// Fetch a user by ID.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, DbError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    /// Resolve a bearer token to its user.
    pub async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.api_token == token).cloned())
    }

    /// List every user.
    pub async fn list_users(&self) -> Result<Vec<User>, DbError> {
        Ok(self.tables.read().await.users.values().cloned().collect())
    }

    // -----------------------------------------------------------------
    // Molecules
    // -----------------------------------------------------------------

    /// Insert a molecule owned by an existing user.
    pub async fn insert_molecule(&self, molecule: &Molecule) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&molecule.created_by) {
            return Err(DbError::Constraint(format!(
                "molecule owner {} does not exist",
                molecule.created_by
            )));
        }
        check_structure(molecule)?;
        tables.molecules.insert(molecule.id, molecule.clone());
        Ok(())
    }

    /// Fetch a molecule by ID.
    pub async fn get_molecule(&self, id: MoleculeId) -> Result<Option<Molecule>, DbError> {
        Ok(self.tables.read().await.molecules.get(&id).cloned())
    }

    /// List every molecule.
    pub async fn list_molecules(&self) -> Result<Vec<Molecule>, DbError> {
        Ok(self.tables.read().await.molecules.values().cloned().collect())
    }

    /// Overwrite the mutable fields of a molecule.
    pub async fn update_molecule(&self, molecule: &Molecule) -> Result<(), DbError> {
        check_structure(molecule)?;
        let mut tables = self.tables.write().await;
        let stored = tables
            .molecules
            .get_mut(&molecule.id)
            .ok_or_else(|| DbError::not_found("molecule", molecule.id))?;
        stored.name.clone_from(&molecule.name);
        stored.smiles.clone_from(&molecule.smiles);
        stored.mol_file.clone_from(&molecule.mol_file);
        stored.formula.clone_from(&molecule.formula);
        stored.molecular_weight = molecule.molecular_weight;
        Ok(())
    }

    /// Delete a molecule, its predictions, and the references logs hold to it.
    pub async fn delete_molecule(&self, id: MoleculeId) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if tables.molecules.remove(&id).is_none() {
            return Err(DbError::not_found("molecule", id));
        }
        tables.predictions.retain(|_, p| p.molecule != id);
        for log in tables.query_logs.values_mut() {
            if log.molecule == Some(id) {
                log.molecule = None;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // Predictions
    // -----------------------------------------------------------------

    /// Insert a prediction tree for an existing molecule.
    pub async fn insert_prediction(&self, prediction: &Prediction) -> Result<(), DbError> {
        if let Some(organ) = prediction.invalid_target_organ() {
            return Err(DbError::Constraint(format!(
                "target organ {} probability {} outside [0, 1]",
                organ.organ, organ.probability
            )));
        }
        let mut tables = self.tables.write().await;
        if !tables.molecules.contains_key(&prediction.molecule) {
            return Err(DbError::Constraint(format!(
                "prediction molecule {} does not exist",
                prediction.molecule
            )));
        }
        tables.predictions.insert(prediction.id, prediction.clone());
        Ok(())
    }

    /// Fetch a prediction tree by ID.
    pub async fn get_prediction(&self, id: PredictionId) -> Result<Option<Prediction>, DbError> {
        Ok(self.tables.read().await.predictions.get(&id).cloned())
    }

    /// List every prediction tree.
    pub async fn list_predictions(&self) -> Result<Vec<Prediction>, DbError> {
        Ok(self.tables.read().await.predictions.values().cloned().collect())
    }

    /// List the prediction trees of one molecule.
    pub async fn list_predictions_for_molecule(
        &self,
        molecule: MoleculeId,
    ) -> Result<Vec<Prediction>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .predictions
            .values()
            .filter(|p| p.molecule == molecule)
            .cloned()
            .collect())
    }

    /// Delete a prediction tree.
    pub async fn delete_prediction(&self, id: PredictionId) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        tables
            .predictions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("prediction", id))
    }

    // -----------------------------------------------------------------
    // Query logs
    // -----------------------------------------------------------------

    /// Insert a query log.
    pub async fn insert_query_log(&self, log: &QueryLog) -> Result<(), DbError> {
        let mut tables = self.tables.write().await;
        if !tables.users.contains_key(&log.user) {
            return Err(DbError::Constraint(format!(
                "query log user {} does not exist",
                log.user
            )));
        }
        if tables.query_logs.contains_key(&log.id) {
            return Err(DbError::Constraint(format!("query log {} already exists", log.id)));
        }
        tables.query_logs.insert(log.id, log.clone());
        Ok(())
    }

    /// Fetch a query log by ID.
    pub async fn get_query_log(&self, id: QueryLogId) -> Result<Option<QueryLog>, DbError> {
        Ok(self.tables.read().await.query_logs.get(&id).cloned())
    }

    /// List logs, optionally restricted to one owner.
    pub async fn list_query_logs(&self, owner: Option<UserId>) -> Result<Vec<QueryLog>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .query_logs
            .values()
            .filter(|log| owner.is_none_or(|o| log.user == o))
            .cloned()
            .collect())
    }

    /// List the logs that reference a molecule.
    pub async fn list_query_logs_for_molecule(
        &self,
        molecule: MoleculeId,
    ) -> Result<Vec<QueryLog>, DbError> {
        let tables = self.tables.read().await;
        Ok(tables
            .query_logs
            .values()
            .filter(|log| log.molecule == Some(molecule))
            .cloned()
            .collect())
    }

    /// Count every stored log.
    pub async fn count_query_logs(&self) -> Result<u64, DbError> {
        let tables = self.tables.read().await;
        Ok(u64::try_from(tables.query_logs.len()).unwrap_or(u64::MAX))
    }

    /// Replace a `processing` log with its terminal state.
    ///
    /// Returns `false` without writing when the stored log is missing or
    /// no longer `processing`.
    pub async fn finish_query_log(&self, log: &QueryLog) -> Result<bool, DbError> {
        let mut tables = self.tables.write().await;
        if let Some(molecule) = log.molecule {
            if !tables.molecules.contains_key(&molecule) {
                return Err(DbError::Constraint(format!(
                    "query log molecule {molecule} does not exist"
                )));
            }
        }
        match tables.query_logs.get_mut(&log.id) {
            Some(stored) if stored.status == QueryStatus::Processing => {
                stored.status = log.status;
                stored.molecule = log.molecule;
                stored.error_message.clone_from(&log.error_message);
                stored.completed_at = log.completed_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn check_structure(molecule: &Molecule) -> Result<(), DbError> {
    if molecule.has_structure() {
        Ok(())
    } else {
        Err(DbError::Constraint(format!(
            "molecule {} has neither SMILES nor a MOL block",
            molecule.id
        )))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use molecula_types::{
        DrugInteraction, InteractionSeverity, QueryType, TargetOrgan, ToxicityPrediction,
    };

    use super::*;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = User::new("alice", "alice-token");
        store.insert_user(&user).await.unwrap();
        (store, user)
    }

    fn processing_log(user: UserId) -> QueryLog {
        let mut log = QueryLog::new(user, QueryType::SmilesUpload, None);
        log.begin().unwrap();
        log
    }

    #[tokio::test]
    async fn duplicate_token_is_rejected() {
        let (store, _) = store_with_user().await;
        let err = store.insert_user(&User::new("bob", "alice-token")).await;
        assert!(matches!(err, Err(DbError::Constraint(_))));
    }

    #[tokio::test]
    async fn token_lookup_finds_user() {
        let (store, user) = store_with_user().await;
        let found = store.find_user_by_token("alice-token").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(store.find_user_by_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn molecule_requires_existing_owner_and_structure() {
        let (store, user) = store_with_user().await;

        let orphan = Molecule::from_smiles(UserId::new(), "CCO");
        assert!(matches!(
            store.insert_molecule(&orphan).await,
            Err(DbError::Constraint(_))
        ));

        let empty = Molecule::from_smiles(user.id, "");
        assert!(matches!(
            store.insert_molecule(&empty).await,
            Err(DbError::Constraint(_))
        ));
    }

    #[tokio::test]
    async fn update_keeps_owner_and_rejects_blank_structure() {
        let (store, user) = store_with_user().await;
        let molecule = Molecule::from_smiles(user.id, "CCO");
        store.insert_molecule(&molecule).await.unwrap();

        let mut edited = molecule.clone().with_name(Some("Ethanol"));
        edited.created_by = UserId::new();
        store.update_molecule(&edited).await.unwrap();
        let stored = store.get_molecule(molecule.id).await.unwrap().unwrap();
        assert_eq!(stored.name.as_deref(), Some("Ethanol"));
        assert_eq!(stored.created_by, user.id);

        let mut blank = stored.clone();
        blank.smiles = String::new();
        assert!(store.update_molecule(&blank).await.is_err());
        assert_eq!(
            store.get_molecule(molecule.id).await.unwrap().map(|m| m.smiles),
            Some("CCO".to_owned())
        );
    }

    #[tokio::test]
    async fn deleting_molecule_cascades_and_clears_log_reference() {
        let (store, user) = store_with_user().await;
        let molecule = Molecule::from_smiles(user.id, "CCO");
        store.insert_molecule(&molecule).await.unwrap();

        let mut prediction = Prediction::new(molecule.id);
        prediction.toxicity = Some(ToxicityPrediction::new());
        prediction.target_organs.push(TargetOrgan::new("Liver", 0.7));
        prediction.drug_interactions.push(DrugInteraction::new(
            "Warfarin",
            InteractionSeverity::High,
            "Bleeding risk",
        ));
        store.insert_prediction(&prediction).await.unwrap();

        let mut log = processing_log(user.id);
        store.insert_query_log(&log).await.unwrap();
        log.complete(Some(molecule.id)).unwrap();
        assert!(store.finish_query_log(&log).await.unwrap());

        store.delete_molecule(molecule.id).await.unwrap();

        assert!(store.get_prediction(prediction.id).await.unwrap().is_none());
        let kept = store.get_query_log(log.id).await.unwrap().unwrap();
        assert_eq!(kept.molecule, None);
        assert_eq!(kept.status, QueryStatus::Completed);
        assert!(matches!(
            store.delete_molecule(molecule.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn prediction_with_bad_probability_is_rejected() {
        let (store, user) = store_with_user().await;
        let molecule = Molecule::from_smiles(user.id, "C");
        store.insert_molecule(&molecule).await.unwrap();

        let mut prediction = Prediction::new(molecule.id);
        prediction.target_organs.push(TargetOrgan::new("Kidney", 2.0));
        assert!(store.insert_prediction(&prediction).await.is_err());
        assert!(store.list_predictions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn finish_applies_only_once() {
        let (store, user) = store_with_user().await;
        let log = processing_log(user.id);
        store.insert_query_log(&log).await.unwrap();

        let mut completed = log.clone();
        completed.complete(None).unwrap();
        let mut failed = log;
        failed.fail("boom").unwrap();

        assert!(store.finish_query_log(&completed).await.unwrap());
        assert!(!store.finish_query_log(&failed).await.unwrap());

        let stored = store.get_query_log(completed.id).await.unwrap().unwrap();
        assert_eq!(stored.status, QueryStatus::Completed);
        assert!(stored.error_message.is_none());
    }

    #[tokio::test]
    async fn deleting_prediction_keeps_molecule() {
        let (store, user) = store_with_user().await;
        let molecule = Molecule::from_smiles(user.id, "CCO");
        store.insert_molecule(&molecule).await.unwrap();
        let mut prediction = Prediction::new(molecule.id);
        prediction.target_organs.push(TargetOrgan::new("Liver", 0.3));
        store.insert_prediction(&prediction).await.unwrap();

        store.delete_prediction(prediction.id).await.unwrap();

        assert!(store.list_predictions_for_molecule(molecule.id).await.unwrap().is_empty());
        assert!(store.get_molecule(molecule.id).await.unwrap().is_some());
        assert!(matches!(
            store.delete_prediction(prediction.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn logs_are_found_by_molecule() {
        let (store, user) = store_with_user().await;
        let molecule = Molecule::from_smiles(user.id, "CCO");
        store.insert_molecule(&molecule).await.unwrap();

        let mut linked = processing_log(user.id);
        store.insert_query_log(&linked).await.unwrap();
        linked.complete(Some(molecule.id)).unwrap();
        assert!(store.finish_query_log(&linked).await.unwrap());
        store.insert_query_log(&processing_log(user.id)).await.unwrap();

        let found = store.list_query_logs_for_molecule(molecule.id).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|l| l.id), Some(linked.id));
    }

    #[tokio::test]
    async fn owner_filter_restricts_logs() {
        let (store, alice) = store_with_user().await;
        let bob = User::new("bob", "bob-token");
        store.insert_user(&bob).await.unwrap();

        store.insert_query_log(&processing_log(alice.id)).await.unwrap();
        store.insert_query_log(&processing_log(bob.id)).await.unwrap();
        store.insert_query_log(&processing_log(bob.id)).await.unwrap();

        assert_eq!(store.list_query_logs(Some(alice.id)).await.unwrap().len(), 1);
        assert_eq!(store.list_query_logs(Some(bob.id)).await.unwrap().len(), 2);
        assert_eq!(store.list_query_logs(None).await.unwrap().len(), 3);
        assert_eq!(store.count_query_logs().await.unwrap(), 3);
    }
}
