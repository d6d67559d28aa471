//! The twelve signal detectors.
//!
//! Each detector is one set-based query over the raw tables plus a
//! classify step, parameterized by the injected `as_of` date and the
//! configured staleness windows. Detectors never see each other's output;
//! the bank runs them independently.
//!
//! The four expired-permit detectors partition non-finaled expired permits
//! by inspection history: over-the-counter permits are their own class,
//! then zero inspections, all-minor inspections, and non-minor activity
//! that never reached a final. A permit with a final inspection on record
//! emits nothing even when the completion date is missing.

use chrono::NaiveDate;
use permit_core::enums::SignalType;
use permit_db::PermitDb;

use crate::error::SignalError;

/// A detected condition before the bank assigns ids and timestamps.
#[derive(Debug, Clone)]
pub(crate) struct Draft {
    pub signal_type: SignalType,
    pub property_key: String,
    pub permit_ref: Option<String>,
    pub detail: String,
}

pub(crate) async fn detect_one(
    db: &PermitDb,
    signal_type: SignalType,
    as_of: NaiveDate,
    config: &permit_config::SignalConfig,
) -> Result<Vec<Draft>, SignalError> {
    match signal_type {
        SignalType::HoldReviewComments => hold_review_comments(db, as_of, config.hold_days).await,
        SignalType::StalledPlanningReview => {
            stalled_review(db, as_of, config.review_stall_days, true).await
        }
        SignalType::StalledGeneralReview => {
            stalled_review(db, as_of, config.review_stall_days, false).await
        }
        SignalType::OpenViolation => open_violation(db).await,
        SignalType::PendingAbatement => pending_abatement(db).await,
        SignalType::ExpiredNoFinal => expired_no_final(db, as_of).await,
        SignalType::StaleRecentActivity => {
            stale_recent_activity(db, as_of, config.stale_days, config.recent_activity_days).await
        }
        SignalType::ExpiredMinorActivity => expired_minor_activity(db, as_of).await,
        SignalType::ExpiredInconclusive => expired_inconclusive(db, as_of).await,
        SignalType::ExpiredOtc => expired_otc(db, as_of).await,
        SignalType::StaleNoActivity => {
            stale_no_activity(db, as_of, config.stale_days, config.recent_activity_days).await
        }
        SignalType::OpenComplaint => open_complaint(db).await,
    }
}

async fn hold_review_comments(
    db: &PermitDb,
    as_of: NaiveDate,
    hold_days: i64,
) -> Result<Vec<Draft>, SignalError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT p.property_key, p.permit_ref, p.status,
                    CAST(julianday(?1) - julianday(p.status_date) AS INTEGER) AS days
             FROM permits p
             WHERE p.status_date IS NOT NULL
               AND LOWER(p.status) LIKE '%hold%'
               AND julianday(?1) - julianday(p.status_date) > ?2
             ORDER BY p.property_key, p.permit_ref",
            libsql::params![as_of.to_string(), hold_days],
        )
        .await?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let status = row.get::<String>(2)?;
        let days = row.get::<i64>(3)?;
        drafts.push(Draft {
            signal_type: SignalType::HoldReviewComments,
            property_key: row.get::<String>(0)?,
            permit_ref: Some(row.get::<String>(1)?),
            detail: format!("on hold {days} days with unresolved review comments ({status})"),
        });
    }
    Ok(drafts)
}

/// Shared query for the two stalled-review detectors. Planning reviews are
/// the ones whose status names a plan phase; everything else with a review
/// status falls to the general detector.
async fn stalled_review(
    db: &PermitDb,
    as_of: NaiveDate,
    stall_days: i64,
    planning: bool,
) -> Result<Vec<Draft>, SignalError> {
    let plan_clause = if planning {
        "AND LOWER(p.status) LIKE '%plan%'"
    } else {
        "AND LOWER(p.status) NOT LIKE '%plan%'"
    };
    let mut rows = db
        .conn()
        .query(
            &format!(
                "SELECT p.property_key, p.permit_ref,
                        CAST(julianday(?1) - julianday(p.status_date) AS INTEGER) AS days
                 FROM permits p
                 WHERE p.status_date IS NOT NULL
                   AND LOWER(p.status) LIKE '%review%'
                   {plan_clause}
                   AND julianday(?1) - julianday(p.status_date) > ?2
                 ORDER BY p.property_key, p.permit_ref"
            ),
            libsql::params![as_of.to_string(), stall_days],
        )
        .await?;

    let (signal_type, label) = if planning {
        (SignalType::StalledPlanningReview, "planning review")
    } else {
        (SignalType::StalledGeneralReview, "review")
    };
    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let days = row.get::<i64>(2)?;
        drafts.push(Draft {
            signal_type,
            property_key: row.get::<String>(0)?,
            permit_ref: Some(row.get::<String>(1)?),
            detail: format!("{label} open {days} days without movement"),
        });
    }
    Ok(drafts)
}

async fn open_violation(db: &PermitDb) -> Result<Vec<Draft>, SignalError> {
    violation_stage(db, "nov", SignalType::OpenViolation, "notice of violation").await
}

async fn pending_abatement(db: &PermitDb) -> Result<Vec<Draft>, SignalError> {
    violation_stage(db, "abatement", SignalType::PendingAbatement, "abatement").await
}

async fn violation_stage(
    db: &PermitDb,
    stage: &str,
    signal_type: SignalType,
    label: &str,
) -> Result<Vec<Draft>, SignalError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT v.property_key, v.permit_ref, v.opened_at
             FROM violations v
             WHERE v.stage = ?1 AND v.resolved_at IS NULL AND LOWER(v.status) = 'open'
             ORDER BY v.property_key, v.id",
            [stage],
        )
        .await?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let opened = row
            .get::<Option<String>>(2)?
            .unwrap_or_else(|| "unknown date".into());
        drafts.push(Draft {
            signal_type,
            property_key: row.get::<String>(0)?,
            permit_ref: row.get::<Option<String>>(1)?,
            detail: format!("{label} open since {opened}"),
        });
    }
    Ok(drafts)
}

const EXPIRED_BASE: &str = "p.expiration_date IS NOT NULL
               AND p.expiration_date < ?1
               AND p.completed_date IS NULL";

async fn expired_permits(
    db: &PermitDb,
    as_of: NaiveDate,
    extra_clause: &str,
    signal_type: SignalType,
    label: &str,
) -> Result<Vec<Draft>, SignalError> {
    let mut rows = db
        .conn()
        .query(
            &format!(
                "SELECT p.property_key, p.permit_ref, p.expiration_date
                 FROM permits p
                 WHERE {EXPIRED_BASE}
                   {extra_clause}
                 ORDER BY p.property_key, p.permit_ref"
            ),
            [as_of.to_string()],
        )
        .await?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let expired = row.get::<String>(2)?;
        drafts.push(Draft {
            signal_type,
            property_key: row.get::<String>(0)?,
            permit_ref: Some(row.get::<String>(1)?),
            detail: format!("{label}, expired {expired}"),
        });
    }
    Ok(drafts)
}

async fn expired_no_final(db: &PermitDb, as_of: NaiveDate) -> Result<Vec<Draft>, SignalError> {
    expired_permits(
        db,
        as_of,
        "AND p.is_otc = 0
         AND NOT EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref)",
        SignalType::ExpiredNoFinal,
        "no inspection on record",
    )
    .await
}

async fn expired_minor_activity(
    db: &PermitDb,
    as_of: NaiveDate,
) -> Result<Vec<Draft>, SignalError> {
    expired_permits(
        db,
        as_of,
        "AND p.is_otc = 0
         AND EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref)
         AND NOT EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref
                         AND LOWER(COALESCE(i.result, '')) NOT IN ('partial', 'minor'))",
        SignalType::ExpiredMinorActivity,
        "only minor inspection activity",
    )
    .await
}

async fn expired_inconclusive(db: &PermitDb, as_of: NaiveDate) -> Result<Vec<Draft>, SignalError> {
    expired_permits(
        db,
        as_of,
        "AND p.is_otc = 0
         AND EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref
                     AND LOWER(COALESCE(i.result, '')) NOT IN ('partial', 'minor'))
         AND NOT EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref
                         AND LOWER(COALESCE(i.result, '')) = 'final')",
        SignalType::ExpiredInconclusive,
        "inspection activity never reached a final",
    )
    .await
}

async fn expired_otc(db: &PermitDb, as_of: NaiveDate) -> Result<Vec<Draft>, SignalError> {
    expired_permits(
        db,
        as_of,
        "AND p.is_otc = 1",
        SignalType::ExpiredOtc,
        "over-the-counter permit never finaled",
    )
    .await
}

/// Issued permits idle past the staleness window split on whether the
/// property saw newer filings: recent activity elsewhere on the lot makes
/// the idle permit more suspicious, not less.
async fn stale_issued(
    db: &PermitDb,
    as_of: NaiveDate,
    stale_days: i64,
    recent_days: i64,
    with_recent: bool,
) -> Result<Vec<Draft>, SignalError> {
    let recent_exists = "EXISTS (SELECT 1 FROM permits q
                  WHERE q.property_key = p.property_key
                    AND q.permit_ref <> p.permit_ref
                    AND q.filed_date IS NOT NULL
                    AND julianday(?1) - julianday(q.filed_date) <= ?3)";
    let clause = if with_recent {
        format!("AND {recent_exists}")
    } else {
        format!(
            "AND NOT {recent_exists}
             AND NOT EXISTS (SELECT 1 FROM inspections i WHERE i.permit_ref = p.permit_ref)"
        )
    };
    let mut rows = db
        .conn()
        .query(
            &format!(
                "SELECT p.property_key, p.permit_ref,
                        CAST(julianday(?1) - julianday(p.status_date) AS INTEGER) AS days
                 FROM permits p
                 WHERE LOWER(p.status) = 'issued'
                   AND p.status_date IS NOT NULL
                   AND julianday(?1) - julianday(p.status_date) > ?2
                   {clause}
                 ORDER BY p.property_key, p.permit_ref"
            ),
            libsql::params![as_of.to_string(), stale_days, recent_days],
        )
        .await?;

    let (signal_type, label) = if with_recent {
        (
            SignalType::StaleRecentActivity,
            "idle while newer permits were filed on the property",
        )
    } else {
        (SignalType::StaleNoActivity, "idle with no activity")
    };
    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let days = row.get::<i64>(2)?;
        drafts.push(Draft {
            signal_type,
            property_key: row.get::<String>(0)?,
            permit_ref: Some(row.get::<String>(1)?),
            detail: format!("{label} for {days} days"),
        });
    }
    Ok(drafts)
}

async fn stale_recent_activity(
    db: &PermitDb,
    as_of: NaiveDate,
    stale_days: i64,
    recent_days: i64,
) -> Result<Vec<Draft>, SignalError> {
    stale_issued(db, as_of, stale_days, recent_days, true).await
}

async fn stale_no_activity(
    db: &PermitDb,
    as_of: NaiveDate,
    stale_days: i64,
    recent_days: i64,
) -> Result<Vec<Draft>, SignalError> {
    stale_issued(db, as_of, stale_days, recent_days, false).await
}

async fn open_complaint(db: &PermitDb) -> Result<Vec<Draft>, SignalError> {
    let mut rows = db
        .conn()
        .query(
            "SELECT c.property_key, c.opened_at
             FROM complaints c
             WHERE LOWER(c.status) = 'open' AND c.closed_at IS NULL
             ORDER BY c.property_key, c.id",
            (),
        )
        .await?;

    let mut drafts = Vec::new();
    while let Some(row) = rows.next().await? {
        let opened = row
            .get::<Option<String>>(1)?
            .unwrap_or_else(|| "unknown date".into());
        drafts.push(Draft {
            signal_type: SignalType::OpenComplaint,
            property_key: row.get::<String>(0)?,
            permit_ref: None,
            detail: format!("complaint open since {opened}"),
        });
    }
    Ok(drafts)
}
