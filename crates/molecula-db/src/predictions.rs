//! Prediction tree persistence.
//!
//! A prediction spans four tables: `predictions` plus its one-to-one
//! `toxicity_predictions` row and ordered `target_organs` and
//! `drug_interactions` rows. Inserts write the whole tree in one
//! transaction; reads reassemble it with one query per table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use molecula_types::{
    DrugInteraction, DrugInteractionId, InteractionSeverity, MoleculeId, Prediction,
    PredictionId, TargetOrgan, TargetOrganId, ToxicityPrediction, ToxicityPredictionId,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, write_error};

const SELECT_PREDICTION: &str = r"SELECT id, molecule_id, solubility, logp, drug_likeness, bioavailability, half_life, created_at
      FROM predictions";

/// Operations on the prediction tables.
pub struct PredictionStore<'a> {
    pool: &'a PgPool,
}

impl<'a> PredictionStore<'a> {
    /// Create a new prediction store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a prediction with all of its sub-records.
    ///
    /// Either the whole tree is committed or none of it is.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if the molecule does not exist or a
    /// target organ probability is out of range.
    pub async fn insert(&self, prediction: &Prediction) -> Result<(), DbError> {
        if let Some(organ) = prediction.invalid_target_organ() {
            return Err(DbError::Constraint(format!(
                "target organ {} probability {} outside [0, 1]",
                organ.organ, organ.probability
            )));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"INSERT INTO predictions (id, molecule_id, solubility, logp, drug_likeness, bioavailability, half_life, created_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(prediction.id.into_inner())
        .bind(prediction.molecule.into_inner())
        .bind(prediction.solubility)
        .bind(prediction.logp)
        .bind(prediction.drug_likeness)
        .bind(prediction.bioavailability)
        .bind(&prediction.half_life)
        .bind(prediction.created_at)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        if let Some(tox) = &prediction.toxicity {
            sqlx::query(
                r"INSERT INTO toxicity_predictions (id, prediction_id, hepatotoxicity, cardiotoxicity, nephrotoxicity, neurotoxicity)
                  VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(tox.id.into_inner())
            .bind(prediction.id.into_inner())
            .bind(tox.hepatotoxicity)
            .bind(tox.cardiotoxicity)
            .bind(tox.nephrotoxicity)
            .bind(tox.neurotoxicity)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        }

        for (position, organ) in prediction.target_organs.iter().enumerate() {
            sqlx::query(
                r"INSERT INTO target_organs (id, prediction_id, position, organ, probability)
                  VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(organ.id.into_inner())
            .bind(prediction.id.into_inner())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&organ.organ)
            .bind(organ.probability)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        }

        for (position, interaction) in prediction.drug_interactions.iter().enumerate() {
            sqlx::query(
                r"INSERT INTO drug_interactions (id, prediction_id, position, drug, severity, description)
                  VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(interaction.id.into_inner())
            .bind(prediction.id.into_inner())
            .bind(i32::try_from(position).unwrap_or(i32::MAX))
            .bind(&interaction.drug)
            .bind(interaction.severity.as_str())
            .bind(&interaction.description)
            .execute(&mut *tx)
            .await
            .map_err(write_error)?;
        }

        tx.commit().await?;

        tracing::debug!(
            prediction_id = %prediction.id,
            molecule_id = %prediction.molecule,
            target_organs = prediction.target_organs.len(),
            drug_interactions = prediction.drug_interactions.len(),
            "Inserted prediction tree"
        );
        Ok(())
    }

    /// Fetch a prediction tree by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails, or
    /// [`DbError::Decode`] if a stored severity is unknown.
    pub async fn get(&self, id: PredictionId) -> Result<Option<Prediction>, DbError> {
        let row = sqlx::query_as::<_, PredictionRow>(&format!("{SELECT_PREDICTION} WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.assemble(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    /// List every prediction tree in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails, or
    /// [`DbError::Decode`] if a stored severity is unknown.
    pub async fn list(&self) -> Result<Vec<Prediction>, DbError> {
        let rows = sqlx::query_as::<_, PredictionRow>(&format!("{SELECT_PREDICTION} ORDER BY id"))
            .fetch_all(self.pool)
            .await?;

        self.assemble(rows).await
    }

    /// List the prediction trees of one molecule in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if a query fails, or
    /// [`DbError::Decode`] if a stored severity is unknown.
    pub async fn list_for_molecule(&self, molecule: MoleculeId) -> Result<Vec<Prediction>, DbError> {
        let rows = sqlx::query_as::<_, PredictionRow>(&format!(
            "{SELECT_PREDICTION} WHERE molecule_id = $1 ORDER BY id"
        ))
        .bind(molecule.into_inner())
        .fetch_all(self.pool)
        .await?;

        self.assemble(rows).await
    }

    /// Delete a prediction and its sub-records.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such prediction exists.
    pub async fn delete(&self, id: PredictionId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM predictions WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("prediction", id));
        }
        Ok(())
    }

    /// Load the sub-records for a batch of prediction rows and stitch the
    /// trees together, preserving row order.
    async fn assemble(&self, rows: Vec<PredictionRow>) -> Result<Vec<Prediction>, DbError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let toxicities = sqlx::query_as::<_, ToxicityRow>(
            r"SELECT id, prediction_id, hepatotoxicity, cardiotoxicity, nephrotoxicity, neurotoxicity
              FROM toxicity_predictions WHERE prediction_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let organs = sqlx::query_as::<_, TargetOrganRow>(
            r"SELECT id, prediction_id, organ, probability
              FROM target_organs WHERE prediction_id = ANY($1)
              ORDER BY prediction_id, position",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let interactions = sqlx::query_as::<_, DrugInteractionRow>(
            r"SELECT id, prediction_id, drug, severity, description
              FROM drug_interactions WHERE prediction_id = ANY($1)
              ORDER BY prediction_id, position",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut tox_by_prediction: HashMap<Uuid, ToxicityPrediction> = toxicities
            .into_iter()
            .map(|row| (row.prediction_id, ToxicityPrediction::from(row)))
            .collect();

        let mut organs_by_prediction: HashMap<Uuid, Vec<TargetOrgan>> = HashMap::new();
        for row in organs {
            organs_by_prediction
                .entry(row.prediction_id)
                .or_default()
                .push(TargetOrgan::from(row));
        }

        let mut interactions_by_prediction: HashMap<Uuid, Vec<DrugInteraction>> = HashMap::new();
        for row in interactions {
            interactions_by_prediction
                .entry(row.prediction_id)
                .or_default()
                .push(DrugInteraction::try_from(row)?);
        }

        Ok(rows
            .into_iter()
            .map(|row| Prediction {
                id: PredictionId::from(row.id),
                molecule: MoleculeId::from(row.molecule_id),
                solubility: row.solubility,
                logp: row.logp,
                drug_likeness: row.drug_likeness,
                bioavailability: row.bioavailability,
                half_life: row.half_life,
                created_at: row.created_at,
                toxicity: tox_by_prediction.remove(&row.id),
                target_organs: organs_by_prediction.remove(&row.id).unwrap_or_default(),
                drug_interactions: interactions_by_prediction
                    .remove(&row.id)
                    .unwrap_or_default(),
            })
            .collect())
    }
}

/// A row from the `predictions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PredictionRow {
    /// Prediction ID.
    pub id: Uuid,
    /// Owning molecule.
    pub molecule_id: Uuid,
    /// Solubility score.
    pub solubility: Option<f64>,
    /// LogP.
    pub logp: Option<f64>,
    /// Drug-likeness score.
    pub drug_likeness: Option<f64>,
    /// Bioavailability score.
    pub bioavailability: Option<f64>,
    /// Half-life text.
    pub half_life: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// A row from the `toxicity_predictions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ToxicityRow {
    /// Sub-record ID.
    pub id: Uuid,
    /// Parent prediction.
    pub prediction_id: Uuid,
    /// Liver toxicity.
    pub hepatotoxicity: Option<f64>,
    /// Heart toxicity.
    pub cardiotoxicity: Option<f64>,
    /// Kidney toxicity.
    pub nephrotoxicity: Option<f64>,
    /// Nervous system toxicity.
    pub neurotoxicity: Option<f64>,
}

impl From<ToxicityRow> for ToxicityPrediction {
    fn from(row: ToxicityRow) -> Self {
        Self {
            id: ToxicityPredictionId::from(row.id),
            hepatotoxicity: row.hepatotoxicity,
            cardiotoxicity: row.cardiotoxicity,
            nephrotoxicity: row.nephrotoxicity,
            neurotoxicity: row.neurotoxicity,
        }
    }
}

/// A row from the `target_organs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TargetOrganRow {
    /// Sub-record ID.
    pub id: Uuid,
    /// Parent prediction.
    pub prediction_id: Uuid,
    /// Organ name.
    pub organ: String,
    /// Probability in `[0, 1]`.
    pub probability: f64,
}

impl From<TargetOrganRow> for TargetOrgan {
    fn from(row: TargetOrganRow) -> Self {
        Self {
            id: TargetOrganId::from(row.id),
            organ: row.organ,
            probability: row.probability,
        }
    }
}

/// A row from the `drug_interactions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DrugInteractionRow {
    /// Sub-record ID.
    pub id: Uuid,
    /// Parent prediction.
    pub prediction_id: Uuid,
    /// Interacting drug.
    pub drug: String,
    /// Severity as stored (`Low`, `Moderate`, `High`).
    pub severity: String,
    /// Free-text description.
    pub description: String,
}

impl TryFrom<DrugInteractionRow> for DrugInteraction {
    type Error = DbError;

    fn try_from(row: DrugInteractionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: DrugInteractionId::from(row.id),
            drug: row.drug,
            severity: row.severity.parse::<InteractionSeverity>()?,
            description: row.description,
        })
    }
}
