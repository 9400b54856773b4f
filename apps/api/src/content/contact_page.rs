use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::content::resource::Resource;
use crate::errors::AppError;
use crate::models::content::{ContactAddressRow, ContactLocationRow, ContactPageContentRow};
use crate::validation::{
    http_url, optional, patch_nullable, patch_required, required,
};

// ────────────────────────────────────────────────────────────────────────────
// Address cards
// ────────────────────────────────────────────────────────────────────────────

pub struct ContactAddresses;

#[derive(Debug, Deserialize)]
pub struct ContactAddressInput {
    pub title: String,
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactAddressPatch {
    pub title: Option<String>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for ContactAddresses {
    const TABLE: &'static str = "contact_addresses";
    const LABEL: &'static str = "Contact address";
    const ORDER_BY: &'static str = "display_order ASC, title ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = ContactAddressRow;
    type Create = ContactAddressInput;
    type Patch = ContactAddressPatch;

    async fn insert(
        pool: &PgPool,
        input: ContactAddressInput,
    ) -> Result<ContactAddressRow, AppError> {
        let row = sqlx::query_as::<_, ContactAddressRow>(
            r#"
            INSERT INTO contact_addresses
                (title, address_line_1, address_line_2, city, state, postal_code, country,
                 display_order, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7,
                    COALESCE($8, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM contact_addresses)),
                    COALESCE($9, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(required("address_line_1", &input.address_line_1)?)
        .bind(optional(input.address_line_2))
        .bind(required("city", &input.city)?)
        .bind(required("state", &input.state)?)
        .bind(required("postal_code", &input.postal_code)?)
        .bind(required("country", &input.country)?)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?;
        info!("Inserted contact address {}", row.id);
        Ok(row)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ContactAddressPatch,
    ) -> Result<Option<ContactAddressRow>, AppError> {
        Ok(sqlx::query_as::<_, ContactAddressRow>(
            r#"
            UPDATE contact_addresses SET
                title = COALESCE($2, title),
                address_line_1 = COALESCE($3, address_line_1),
                address_line_2 = CASE WHEN $4::text IS NULL THEN address_line_2 ELSE NULLIF($4, '') END,
                city = COALESCE($5, city),
                state = COALESCE($6, state),
                postal_code = COALESCE($7, postal_code),
                country = COALESCE($8, country),
                display_order = COALESCE($9, display_order),
                is_active = COALESCE($10, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_required("address_line_1", patch.address_line_1)?)
        .bind(patch_nullable(patch.address_line_2))
        .bind(patch_required("city", patch.city)?)
        .bind(patch_required("state", patch.state)?)
        .bind(patch_required("postal_code", patch.postal_code)?)
        .bind(patch_required("country", patch.country)?)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Location links (maps, directions)
// ────────────────────────────────────────────────────────────────────────────

pub struct ContactLocations;

#[derive(Debug, Deserialize)]
pub struct ContactLocationInput {
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactLocationPatch {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[async_trait]
impl Resource for ContactLocations {
    const TABLE: &'static str = "contact_locations";
    const LABEL: &'static str = "Contact location";
    const ORDER_BY: &'static str = "display_order ASC, title ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = ContactLocationRow;
    type Create = ContactLocationInput;
    type Patch = ContactLocationPatch;

    async fn insert(
        pool: &PgPool,
        input: ContactLocationInput,
    ) -> Result<ContactLocationRow, AppError> {
        Ok(sqlx::query_as::<_, ContactLocationRow>(
            r#"
            INSERT INTO contact_locations (title, url, description, display_order, is_active)
            VALUES ($1, $2, $3,
                    COALESCE($4, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM contact_locations)),
                    COALESCE($5, TRUE))
            RETURNING *
            "#,
        )
        .bind(required("title", &input.title)?)
        .bind(http_url("url", &input.url)?)
        .bind(optional(input.description))
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ContactLocationPatch,
    ) -> Result<Option<ContactLocationRow>, AppError> {
        let url = patch.url.map(|u| http_url("url", &u)).transpose()?;
        Ok(sqlx::query_as::<_, ContactLocationRow>(
            r#"
            UPDATE contact_locations SET
                title = COALESCE($2, title),
                url = COALESCE($3, url),
                description = CASE WHEN $4::text IS NULL THEN description ELSE NULLIF($4, '') END,
                display_order = COALESCE($5, display_order),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patch_required("title", patch.title)?)
        .bind(url)
        .bind(patch_nullable(patch.description))
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Contact page blocks (hours, intro text, ...)
// ────────────────────────────────────────────────────────────────────────────

pub struct ContactPageContents;

#[derive(Debug, Deserialize)]
pub struct ContactPageContentInput {
    pub content_type: String,
    pub title: String,
    pub content: String,
    pub additional_data: Option<Value>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContactPageContentPatch {
    pub content_type: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub additional_data: Option<Value>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Lowercase identifier of at most 50 characters, e.g. `office_hours`.
pub fn validate_content_type(value: &str) -> Result<String, AppError> {
    let key = required("content_type", value)?.to_ascii_lowercase();
    if key.len() > 50
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::Validation(
            "content_type must be at most 50 letters, digits, '_' or '-'".to_string(),
        ));
    }
    Ok(key)
}

/// `additional_data` must be a JSON object; null means "not given".
pub fn validate_additional_data(value: Option<Value>) -> Result<Option<Value>, AppError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(Value::Object(map))),
        Some(_) => Err(AppError::Validation(
            "additional_data must be a JSON object".to_string(),
        )),
    }
}

#[async_trait]
impl Resource for ContactPageContents {
    const TABLE: &'static str = "contact_page_content";
    const LABEL: &'static str = "Contact page content";
    const ORDER_BY: &'static str = "display_order ASC, created_at ASC";
    const PUBLIC_FILTER: Option<&'static str> = Some("is_active");
    const ORDERED: bool = true;

    type Row = ContactPageContentRow;
    type Create = ContactPageContentInput;
    type Patch = ContactPageContentPatch;

    async fn insert(
        pool: &PgPool,
        input: ContactPageContentInput,
    ) -> Result<ContactPageContentRow, AppError> {
        let additional_data = validate_additional_data(input.additional_data)?
            .unwrap_or_else(|| Value::Object(Default::default()));
        Ok(sqlx::query_as::<_, ContactPageContentRow>(
            r#"
            INSERT INTO contact_page_content
                (content_type, title, content, additional_data, display_order, is_active)
            VALUES ($1, $2, $3, $4,
                    COALESCE($5, (SELECT COALESCE(MAX(display_order), 0) + 1 FROM contact_page_content)),
                    COALESCE($6, TRUE))
            RETURNING *
            "#,
        )
        .bind(validate_content_type(&input.content_type)?)
        .bind(required("title", &input.title)?)
        .bind(required("content", &input.content)?)
        .bind(additional_data)
        .bind(input.display_order)
        .bind(input.is_active)
        .fetch_one(pool)
        .await?)
    }

    async fn update(
        pool: &PgPool,
        id: Uuid,
        patch: ContactPageContentPatch,
    ) -> Result<Option<ContactPageContentRow>, AppError> {
        let content_type = patch
            .content_type
            .map(|c| validate_content_type(&c))
            .transpose()?;
        Ok(sqlx::query_as::<_, ContactPageContentRow>(
            r#"
            UPDATE contact_page_content SET
                content_type = COALESCE($2, content_type),
                title = COALESCE($3, title),
                content = COALESCE($4, content),
                additional_data = COALESCE($5, additional_data),
                display_order = COALESCE($6, display_order),
                is_active = COALESCE($7, is_active),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(content_type)
        .bind(patch_required("title", patch.title)?)
        .bind(patch_required("content", patch.content)?)
        .bind(validate_additional_data(patch.additional_data)?)
        .bind(patch.display_order)
        .bind(patch.is_active)
        .fetch_optional(pool)
        .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_is_a_lowercase_key() {
        assert_eq!(validate_content_type(" Office_Hours ").unwrap(), "office_hours");
        assert!(validate_content_type("office hours").is_err());
        assert!(validate_content_type(&"x".repeat(51)).is_err());
        assert!(validate_content_type("  ").is_err());
    }

    #[test]
    fn test_additional_data_must_be_an_object() {
        assert_eq!(validate_additional_data(None).unwrap(), None);
        assert_eq!(validate_additional_data(Some(Value::Null)).unwrap(), None);
        assert_eq!(
            validate_additional_data(Some(json!({ "phone": "0494 2680000" }))).unwrap(),
            Some(json!({ "phone": "0494 2680000" }))
        );
        assert!(validate_additional_data(Some(json!(["a"]))).is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_location_links_list_publicly_in_order(pool: PgPool) {
        use crate::content::resource::{list_public, reorder};

        let maps = ContactLocations::insert(
            &pool,
            ContactLocationInput {
                title: "Google Maps".into(),
                url: "https://maps.example.com/school".into(),
                description: None,
                display_order: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
        let hidden = ContactLocations::insert(
            &pool,
            ContactLocationInput {
                title: "Old campus".into(),
                url: "https://maps.example.com/old".into(),
                description: Some("  ".into()),
                display_order: None,
                is_active: Some(false),
            },
        )
        .await
        .unwrap();
        let bus = ContactLocations::insert(
            &pool,
            ContactLocationInput {
                title: "Bus routes".into(),
                url: "http://transit.example.com".into(),
                description: Some("From Edappal stand".into()),
                display_order: None,
                is_active: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(hidden.description, None);
        assert_eq!((maps.display_order, bus.display_order), (1, 3));

        reorder::<ContactLocations>(&pool, &[bus.id, hidden.id, maps.id])
            .await
            .unwrap();
        let public = list_public::<ContactLocations>(&pool).await.unwrap();
        let titles: Vec<_> = public.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(titles, ["Bus routes", "Google Maps"]);

        let err = ContactLocations::insert(
            &pool,
            ContactLocationInput {
                title: "FTP".into(),
                url: "ftp://example.com".into(),
                description: None,
                display_order: None,
                is_active: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
