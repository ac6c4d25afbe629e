use chrono::NaiveDate;
use serde_json::{json, Map, Value};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::checklist::NewChecklistItem;
use crate::config::{DRAWS_COLLECTION, STREAMS_COLLECTION};
use crate::error::{AppError, Result};
use crate::models::{ChecklistItem, DrawRecord, RecordSchema};

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

async fn insert_document(
    pool: &PgPool,
    collection: &str,
    source_key: &str,
    doc: &Value,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO draw_insights.documents (id, collection, doc, source_key)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(collection)
    .bind(doc)
    .bind(source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn seed(pool: &PgPool) -> Result<usize> {
    let draws = vec![
        (
            "seed-ee-338",
            json!({
                "drawNumber": "338",
                "drawDate": "2025-02-19",
                "drawName": "French language proficiency",
                "drawCRS": "428",
                "drawSize": "6,500",
                "dd1": "714", "dd2": "12,356", "dd3": "58,144", "dd4": "11,617",
                "dd5": "14,301", "dd6": "11,298", "dd7": "10,684", "dd8": "10,244",
                "dd9": "56,318", "dd10": "11,340", "dd11": "11,789", "dd12": "11,140",
                "dd13": "11,045", "dd14": "11,004", "dd15": "53,489", "dd16": "22,318",
                "dd17": "8,116", "dd18": "211,455",
            }),
        ),
        (
            "seed-ee-337",
            json!({
                "drawNumber": "337",
                "drawDate": "2025-02-05",
                "drawName": "Canadian Experience Class",
                "drawCRS": "521",
                "drawSize": "4,000",
                "dd1": "544", "dd2": "15,912", "dd3": "59,612", "dd4": "12,901",
                "dd5": "14,009", "dd6": "11,104", "dd7": "11,022", "dd8": "10,576",
                "dd9": "56,008", "dd10": "11,220", "dd11": "11,631", "dd12": "11,058",
                "dd13": "11,124", "dd14": "10,975", "dd15": "52,806", "dd16": "22,100",
                "dd17": "8,012", "dd18": "215,004",
            }),
        ),
        (
            "seed-ee-336",
            json!({
                "drawNumber": "336",
                "drawDate": "2025-01-23",
                "drawName": "Canadian Experience Class",
                "drawCRS": "527",
                "drawSize": "4,000",
                "dd1": "493", "dd2": "16,098", "dd3": "59,011", "dd4": "12,400",
                "dd5": "13,900", "dd6": "11,200", "dd7": "10,905", "dd8": "10,606",
                "dd9": "55,774", "dd10": "11,102", "dd11": "11,580", "dd12": "11,011",
                "dd13": "11,090", "dd14": "10,991", "dd15": "52,603", "dd16": "22,050",
                "dd17": "7,998", "dd18": "214,027",
            }),
        ),
        (
            "seed-ee-335",
            json!({
                "drawNumber": "335",
                "drawDate": "2025-01-07",
                "drawName": "Provincial Nominee Program",
                "drawCRS": "793",
                "drawSize": "471",
                "dd18": "213,912",
            }),
        ),
    ];

    let streams = vec![
        (
            "seed-oinp-2025-01",
            json!({
                "document_type": "draw",
                "year": 2025,
                "date_issued": "2025-01-21",
                "stream": "Employer Job Offer: Foreign Worker stream",
                "number_of_invitations_issued": "1,002",
                "score_range": "52 and above",
                "date_profiles_created": "January 15, 2024 - January 21, 2025",
                "notes": "General draw",
            }),
        ),
        (
            "seed-oinp-2025-02",
            json!({
                "document_type": "draw",
                "year": 2025,
                "date_issued": "2025-01-14",
                "stream": "PhD Graduate stream",
                "number_of_invitations_issued": "58",
                "score_range": "40 and above",
                "notes": "General draw",
            }),
        ),
    ];

    let mut inserted = 0usize;
    for (source_key, doc) in draws {
        if insert_document(pool, DRAWS_COLLECTION, source_key, &doc).await? {
            inserted += 1;
        }
    }
    for (source_key, doc) in streams {
        if insert_document(pool, STREAMS_COLLECTION, source_key, &doc).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn into_documents(rows: Vec<sqlx::postgres::PgRow>) -> Result<Vec<Map<String, Value>>> {
    let mut documents = Vec::with_capacity(rows.len());
    for row in rows {
        if let Value::Object(fields) = row.try_get::<Value, _>("doc")? {
            documents.push(fields);
        }
    }
    Ok(documents)
}

/// Every document of `collection`, in no particular order.
pub async fn fetch_collection(pool: &PgPool, collection: &str) -> Result<Vec<Map<String, Value>>> {
    let rows = sqlx::query("SELECT doc FROM draw_insights.documents WHERE collection = $1")
        .bind(collection)
        .fetch_all(pool)
        .await?;

    let documents = into_documents(rows)?;
    debug!(collection, count = documents.len(), "fetched collection");
    Ok(documents)
}

/// Documents of `collection` whose text field `field` equals `value`.
pub async fn fetch_where(
    pool: &PgPool,
    collection: &str,
    field: &str,
    value: &str,
) -> Result<Vec<Map<String, Value>>> {
    let rows = sqlx::query(
        "SELECT doc FROM draw_insights.documents WHERE collection = $1 AND doc ->> $2 = $3",
    )
    .bind(collection)
    .bind(field)
    .bind(value)
    .fetch_all(pool)
    .await?;

    let documents = into_documents(rows)?;
    debug!(collection, field, value, count = documents.len(), "fetched filtered collection");
    Ok(documents)
}

pub async fn load_draws(
    pool: &PgPool,
    collection: &str,
    schema: &RecordSchema,
) -> Result<Vec<DrawRecord>> {
    let documents = fetch_collection(pool, collection).await?;
    info!(collection, count = documents.len(), "loaded draws");
    Ok(documents
        .into_iter()
        .map(|doc| DrawRecord::from_document(doc, schema))
        .collect())
}

/// Imports every CSV row as a document of display strings. A `source_key`
/// column, when present, makes re-imports idempotent.
pub async fn import_csv(
    pool: &PgPool,
    collection: &str,
    csv_path: &std::path::Path,
) -> Result<usize> {
    let mut reader = csv::Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    let mut inserted = 0usize;

    for result in reader.records() {
        let row = result?;
        let mut doc = Map::new();
        let mut source_key = None;

        for (header, value) in headers.iter().zip(row.iter()) {
            if header == "source_key" {
                source_key = Some(value.to_string()).filter(|key| !key.is_empty());
            } else if !value.is_empty() {
                doc.insert(header.to_string(), Value::String(value.to_string()));
            }
        }

        let source_key = source_key.unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        if insert_document(pool, collection, &source_key, &Value::Object(doc)).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

fn checklist_from_row(row: &sqlx::postgres::PgRow) -> Result<ChecklistItem> {
    Ok(ChecklistItem {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        text: row.try_get("text")?,
        due_date: row.try_get::<Option<NaiveDate>, _>("due_date")?,
        done: row.try_get("done")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn list_checklist(pool: &PgPool, user_id: &str) -> Result<Vec<ChecklistItem>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, text, due_date, done, created_at, updated_at
        FROM draw_insights.checklist_items
        WHERE user_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(checklist_from_row).collect()
}

pub async fn add_checklist_item(
    pool: &PgPool,
    user_id: &str,
    item: &NewChecklistItem,
) -> Result<ChecklistItem> {
    let row = sqlx::query(
        r#"
        INSERT INTO draw_insights.checklist_items (id, user_id, text, due_date, done)
        VALUES ($1, $2, $3, $4, FALSE)
        RETURNING id, user_id, text, due_date, done, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(&item.text)
    .bind(item.due_date)
    .fetch_one(pool)
    .await?;

    checklist_from_row(&row)
}

pub async fn set_checklist_done(
    pool: &PgPool,
    user_id: &str,
    item_id: Uuid,
    done: bool,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE draw_insights.checklist_items
        SET done = $3, updated_at = now()
        WHERE user_id = $1 AND id = $2
        "#,
    )
    .bind(user_id)
    .bind(item_id)
    .bind(done)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ChecklistItemNotFound(item_id));
    }
    Ok(())
}

pub async fn delete_checklist_item(pool: &PgPool, user_id: &str, item_id: Uuid) -> Result<()> {
    let result = sqlx::query(
        "DELETE FROM draw_insights.checklist_items WHERE user_id = $1 AND id = $2",
    )
    .bind(user_id)
    .bind(item_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::ChecklistItemNotFound(item_id));
    }
    Ok(())
}
