//! Molecule persistence.
//!
//! Deleting a molecule cascades to its predictions (and their
//! sub-records) and clears the molecule reference on any query log that
//! points at it. Both effects are declared as foreign keys in the schema.

use chrono::{DateTime, Utc};
use molecula_types::{Molecule, MoleculeId, UserId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, write_error};

const SELECT_MOLECULE: &str = r"SELECT id, name, smiles, mol_file, formula, molecular_weight, created_at, created_by
      FROM molecules";

/// Operations on the `molecules` table.
pub struct MoleculeStore<'a> {
    pool: &'a PgPool,
}

impl<'a> MoleculeStore<'a> {
    /// Create a new molecule store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a molecule.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Constraint`] if the owner does not exist or the
    /// record has no structure.
    pub async fn insert(&self, molecule: &Molecule) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO molecules (id, name, smiles, mol_file, formula, molecular_weight, created_at, created_by)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(molecule.id.into_inner())
        .bind(&molecule.name)
        .bind(&molecule.smiles)
        .bind(&molecule.mol_file)
        .bind(&molecule.formula)
        .bind(molecule.molecular_weight)
        .bind(molecule.created_at)
        .bind(molecule.created_by.into_inner())
        .execute(self.pool)
        .await
        .map_err(write_error)?;

        tracing::debug!(molecule_id = %molecule.id, "Inserted molecule");
        Ok(())
    }

    /// Fetch a molecule by ID.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: MoleculeId) -> Result<Option<Molecule>, DbError> {
        let row = sqlx::query_as::<_, MoleculeRow>(&format!("{SELECT_MOLECULE} WHERE id = $1"))
            .bind(id.into_inner())
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Molecule::from))
    }

    /// List every molecule in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<Molecule>, DbError> {
        let rows = sqlx::query_as::<_, MoleculeRow>(&format!("{SELECT_MOLECULE} ORDER BY id"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Molecule::from).collect())
    }

    /// Overwrite the mutable fields of a molecule.
    ///
    /// `created_at` and `created_by` are immutable and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such molecule exists.
    pub async fn update(&self, molecule: &Molecule) -> Result<(), DbError> {
        let result = sqlx::query(
            r"UPDATE molecules
              SET name = $2, smiles = $3, mol_file = $4, formula = $5, molecular_weight = $6
              WHERE id = $1",
        )
        .bind(molecule.id.into_inner())
        .bind(&molecule.name)
        .bind(&molecule.smiles)
        .bind(&molecule.mol_file)
        .bind(&molecule.formula)
        .bind(molecule.molecular_weight)
        .execute(self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("molecule", molecule.id));
        }
        Ok(())
    }

    /// Delete a molecule and everything that cascades from it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if no such molecule exists.
    pub async fn delete(&self, id: MoleculeId) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM molecules WHERE id = $1")
            .bind(id.into_inner())
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("molecule", id));
        }
        tracing::info!(molecule_id = %id, "Deleted molecule");
        Ok(())
    }
}

/// A row from the `molecules` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MoleculeRow {
    /// Molecule ID.
    pub id: Uuid,
    /// Display name.
    pub name: Option<String>,
    /// SMILES notation.
    pub smiles: String,
    /// MOL block.
    pub mol_file: Option<String>,
    /// Molecular formula.
    pub formula: Option<String>,
    /// Molecular weight.
    pub molecular_weight: Option<f64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Owning user.
    pub created_by: Uuid,
}

impl From<MoleculeRow> for Molecule {
    fn from(row: MoleculeRow) -> Self {
        Self {
            id: MoleculeId::from(row.id),
            name: row.name,
            smiles: row.smiles,
            mol_file: row.mol_file,
            formula: row.formula,
            molecular_weight: row.molecular_weight,
            created_at: row.created_at,
            created_by: UserId::from(row.created_by),
        }
    }
}
