//! Raw-table repository: contacts, permits, inspections, violations,
//! complaints.
//!
//! These tables are owned by the external ingestion jobs; the engine only
//! reads them. The insert methods exist for the ingestion write surface and
//! test fixtures, and return the assigned rowid where applicable.

use permit_core::enums::SourceFeed;
use permit_core::records::{Contact, Permit};

use crate::PermitDb;
use crate::error::DatabaseError;
use crate::helpers::{get_opt_string, parse_enum, parse_optional_date};

/// Contact fields as supplied by a feed, before the database assigns a rowid.
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub source_feed: String,
    pub permit_ref: String,
    pub name: Option<String>,
    pub firm: Option<String>,
    pub role: Option<String>,
    pub license_no: Option<String>,
    pub business_license_no: Option<String>,
    pub source_ref: Option<String>,
}

fn row_to_contact(row: &libsql::Row) -> Result<Contact, DatabaseError> {
    let id = row.get::<i64>(0)?;
    let raw_feed = row.get::<String>(1)?;
    let feed: SourceFeed = parse_enum(&raw_feed)?;
    if feed == SourceFeed::Unknown {
        tracing::warn!(
            contact = id,
            feed = %raw_feed,
            "unrecognized source feed, keeping row as unknown"
        );
    }
    Ok(Contact {
        id,
        source_feed: feed,
        permit_ref: row.get::<String>(2)?,
        name: get_opt_string(row, 3)?,
        firm: get_opt_string(row, 4)?,
        role: get_opt_string(row, 5)?,
        license_no: get_opt_string(row, 6)?,
        business_license_no: get_opt_string(row, 7)?,
        source_ref: get_opt_string(row, 8)?,
    })
}

fn row_to_permit(row: &libsql::Row) -> Result<Permit, DatabaseError> {
    Ok(Permit {
        permit_ref: row.get::<String>(0)?,
        property_key: row.get::<String>(1)?,
        permit_type: get_opt_string(row, 2)?,
        status: get_opt_string(row, 3)?,
        status_date: parse_optional_date(get_opt_string(row, 4)?.as_deref())?,
        filed_date: parse_optional_date(get_opt_string(row, 5)?.as_deref())?,
        approved_date: parse_optional_date(get_opt_string(row, 6)?.as_deref())?,
        expiration_date: parse_optional_date(get_opt_string(row, 7)?.as_deref())?,
        completed_date: parse_optional_date(get_opt_string(row, 8)?.as_deref())?,
        estimated_cost: row.get::<Option<f64>>(9)?,
        neighborhood: get_opt_string(row, 10)?,
        is_otc: row.get::<i64>(11)? != 0,
        description: get_opt_string(row, 12)?,
    })
}

impl PermitDb {
    /// Insert a contact row and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn insert_contact(&self, contact: &NewContact) -> Result<i64, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO contacts (source_feed, permit_ref, name, firm, role, license_no, business_license_no, source_ref)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                libsql::params![
                    contact.source_feed.as_str(),
                    contact.permit_ref.as_str(),
                    contact.name.as_deref(),
                    contact.firm.as_deref(),
                    contact.role.as_deref(),
                    contact.license_no.as_deref(),
                    contact.business_license_no.as_deref(),
                    contact.source_ref.as_deref()
                ],
            )
            .await?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Upsert a permit row keyed by `permit_ref`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the write fails.
    pub async fn insert_permit(&self, permit: &Permit) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO permits
                 (permit_ref, property_key, permit_type, status, status_date, filed_date,
                  approved_date, expiration_date, completed_date, estimated_cost, neighborhood, is_otc, description)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                libsql::params![
                    permit.permit_ref.as_str(),
                    permit.property_key.as_str(),
                    permit.permit_type.as_deref(),
                    permit.status.as_deref(),
                    permit.status_date.map(|d| d.to_string()),
                    permit.filed_date.map(|d| d.to_string()),
                    permit.approved_date.map(|d| d.to_string()),
                    permit.expiration_date.map(|d| d.to_string()),
                    permit.completed_date.map(|d| d.to_string()),
                    permit.estimated_cost,
                    permit.neighborhood.as_deref(),
                    i64::from(permit.is_otc),
                    permit.description.as_deref()
                ],
            )
            .await?;
        Ok(())
    }

    /// Insert an inspection event and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn insert_inspection(
        &self,
        permit_ref: &str,
        inspector: Option<&str>,
        result: Option<&str>,
        inspected_at: Option<chrono::NaiveDate>,
    ) -> Result<i64, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO inspections (permit_ref, inspector, result, inspected_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    permit_ref,
                    inspector,
                    result,
                    inspected_at.map(|d| d.to_string())
                ],
            )
            .await?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Insert a violation record and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn insert_violation(
        &self,
        property_key: &str,
        permit_ref: Option<&str>,
        stage: &str,
        status: &str,
        opened_at: Option<chrono::NaiveDate>,
        resolved_at: Option<chrono::NaiveDate>,
    ) -> Result<i64, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO violations (property_key, permit_ref, stage, status, opened_at, resolved_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                libsql::params![
                    property_key,
                    permit_ref,
                    stage,
                    status,
                    opened_at.map(|d| d.to_string()),
                    resolved_at.map(|d| d.to_string())
                ],
            )
            .await?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Insert a complaint record and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the insert fails.
    pub async fn insert_complaint(
        &self,
        property_key: &str,
        status: &str,
        opened_at: Option<chrono::NaiveDate>,
        closed_at: Option<chrono::NaiveDate>,
    ) -> Result<i64, DatabaseError> {
        self.conn()
            .execute(
                "INSERT INTO complaints (property_key, status, opened_at, closed_at)
                 VALUES (?1, ?2, ?3, ?4)",
                libsql::params![
                    property_key,
                    status,
                    opened_at.map(|d| d.to_string()),
                    closed_at.map(|d| d.to_string())
                ],
            )
            .await?;
        Ok(self.conn().last_insert_rowid())
    }

    /// Fetch all contacts in the resolver's canonical processing order:
    /// feed, then permit, then rowid. The cascade's determinism depends on
    /// this ordering being stable across runs.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query or row parsing fails.
    pub async fn fetch_contacts_ordered(&self) -> Result<Vec<Contact>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, source_feed, permit_ref, name, firm, role, license_no, business_license_no, source_ref
                 FROM contacts ORDER BY source_feed, permit_ref, id",
                (),
            )
            .await?;

        let mut contacts = Vec::new();
        while let Some(row) = rows.next().await? {
            contacts.push(row_to_contact(&row)?);
        }
        Ok(contacts)
    }

    /// Fetch one permit by reference.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NoResult` if no such permit exists.
    pub async fn get_permit(&self, permit_ref: &str) -> Result<Permit, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT permit_ref, property_key, permit_type, status, status_date, filed_date,
                        approved_date, expiration_date, completed_date, estimated_cost, neighborhood, is_otc, description
                 FROM permits WHERE permit_ref = ?1",
                [permit_ref],
            )
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        row_to_permit(&row)
    }

    /// Count the contact rows currently ingested.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the query fails.
    pub async fn count_contacts(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM contacts", ())
            .await?;
        let row = rows.next().await?.ok_or(DatabaseError::NoResult)?;
        Ok(u64::try_from(row.get::<i64>(0)?).unwrap_or(0))
    }
}
