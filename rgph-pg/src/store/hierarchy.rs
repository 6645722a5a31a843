//! Hiérarchie administrative: pays, régions, départements, communes

use std::collections::HashMap;

use deadpool_postgres::GenericClient;
use tokio_postgres::Row;
use tracing::{debug, info};

use rgph_io::{AggregateBoundary, BoundarySet};

use crate::models::{Commune, Country, Department, Region, ZoneLevel};
use crate::report::ImportReport;
use crate::store::{Entity, Param};

impl Entity for Country {
    const TABLE: &'static str = "country";
    const COLUMNS: &'static [&'static str] = &["name", "code", "geo_json"];
    const ORDER_BY: &'static str = "name";

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            code: row.try_get("code")?,
            geo_json: row.try_get("geo_json")?,
        })
    }

    fn params(&self) -> Vec<Param<'_>> {
        vec![&self.name, &self.code, &self.geo_json]
    }

    fn validate(&self) -> Result<(), String> {
        require_text("name", &self.name)?;
        require_text("code", &self.code)
    }
}

impl Entity for Region {
    const TABLE: &'static str = "region";
    const COLUMNS: &'static [&'static str] = &[
        "country_id",
        "adm0_en",
        "adm0_pcode",
        "adm1_en",
        "adm1_pcode",
        "geo_json",
        "date",
        "valid_on",
        "valid_to",
        "area_sqkm",
    ];
    const ORDER_BY: &'static str = "adm1_en";

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            country: row.try_get("country_id")?,
            adm0_en: row.try_get("adm0_en")?,
            adm0_pcode: row.try_get("adm0_pcode")?,
            adm1_en: row.try_get("adm1_en")?,
            adm1_pcode: row.try_get("adm1_pcode")?,
            geo_json: row.try_get("geo_json")?,
            date: row.try_get("date")?,
            valid_on: row.try_get("valid_on")?,
            valid_to: row.try_get("valid_to")?,
            area_sqkm: row.try_get("area_sqkm")?,
        })
    }

    fn params(&self) -> Vec<Param<'_>> {
        vec![
            &self.country,
            &self.adm0_en,
            &self.adm0_pcode,
            &self.adm1_en,
            &self.adm1_pcode,
            &self.geo_json,
            &self.date,
            &self.valid_on,
            &self.valid_to,
            &self.area_sqkm,
        ]
    }

    fn validate(&self) -> Result<(), String> {
        require_text("adm1_en", &self.adm1_en)?;
        require_text("adm1_pcode", &self.adm1_pcode)?;
        require_area(self.area_sqkm)
    }
}

impl Entity for Department {
    const TABLE: &'static str = "department";
    const COLUMNS: &'static [&'static str] = &[
        "region_id",
        "adm2_en",
        "adm2_pcode",
        "geo_json",
        "date",
        "valid_on",
        "valid_to",
        "area_sqkm",
    ];
    const ORDER_BY: &'static str = "adm2_en";

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            region: row.try_get("region_id")?,
            adm2_en: row.try_get("adm2_en")?,
            adm2_pcode: row.try_get("adm2_pcode")?,
            geo_json: row.try_get("geo_json")?,
            date: row.try_get("date")?,
            valid_on: row.try_get("valid_on")?,
            valid_to: row.try_get("valid_to")?,
            area_sqkm: row.try_get("area_sqkm")?,
        })
    }

    fn params(&self) -> Vec<Param<'_>> {
        vec![
            &self.region,
            &self.adm2_en,
            &self.adm2_pcode,
            &self.geo_json,
            &self.date,
            &self.valid_on,
            &self.valid_to,
            &self.area_sqkm,
        ]
    }

    fn validate(&self) -> Result<(), String> {
        require_text("adm2_en", &self.adm2_en)?;
        require_text("adm2_pcode", &self.adm2_pcode)?;
        require_area(self.area_sqkm)
    }
}

impl Entity for Commune {
    const TABLE: &'static str = "commune";
    const COLUMNS: &'static [&'static str] = &[
        "department_id",
        "adm3_en",
        "adm3_pcode",
        "adm3_ref",
        "real_name",
        "geo_json",
        "date",
        "valid_on",
        "valid_to",
        "area_sqkm",
    ];
    const ORDER_BY: &'static str = "adm3_en";

    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            department: row.try_get("department_id")?,
            adm3_en: row.try_get("adm3_en")?,
            adm3_pcode: row.try_get("adm3_pcode")?,
            adm3_ref: row.try_get("adm3_ref")?,
            real_name: row.try_get("real_name")?,
            geo_json: row.try_get("geo_json")?,
            date: row.try_get("date")?,
            valid_on: row.try_get("valid_on")?,
            valid_to: row.try_get("valid_to")?,
            area_sqkm: row.try_get("area_sqkm")?,
        })
    }

    fn params(&self) -> Vec<Param<'_>> {
        vec![
            &self.department,
            &self.adm3_en,
            &self.adm3_pcode,
            &self.adm3_ref,
            &self.real_name,
            &self.geo_json,
            &self.date,
            &self.valid_on,
            &self.valid_to,
            &self.area_sqkm,
        ]
    }

    fn validate(&self) -> Result<(), String> {
        require_text("adm3_en", &self.adm3_en)?;
        require_text("adm3_pcode", &self.adm3_pcode)?;
        require_area(self.area_sqkm)
    }
}

fn require_text(name: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} may not be blank", name));
    }
    Ok(())
}

fn require_area(area: f64) -> Result<(), String> {
    if !area.is_finite() || area < 0.0 {
        return Err(format!("area_sqkm must be a positive number (got {})", area));
    }
    Ok(())
}

/// Nom d'une zone par id et niveau
pub async fn zone_name<C: GenericClient>(
    client: &C,
    schema: &str,
    level: ZoneLevel,
    id: i32,
) -> Result<Option<String>, tokio_postgres::Error> {
    let (table, column) = match level {
        ZoneLevel::Country => ("country", "name"),
        ZoneLevel::Region => ("region", "adm1_en"),
        ZoneLevel::Department => ("department", "adm2_en"),
        ZoneLevel::Commune => ("commune", "adm3_en"),
    };
    let sql = format!("SELECT {} FROM {}.{} WHERE id = $1", column, schema, table);
    Ok(client
        .query_opt(sql.as_str(), &[&id])
        .await?
        .map(|row| row.get(0)))
}

/// Enregistre une insertion ou une mise à jour selon `(xmax = 0)`
fn record_upsert(report: &mut ImportReport, entity_type: &str, row: &Row) {
    if row.get::<_, bool>("inserted") {
        report.record_insert(entity_type);
    } else {
        report.record_update(entity_type);
    }
}

/// Insère ou met à jour les limites administratives par pcode.
///
/// Le pays est créé s'il n'existe pas. Régions et départements gardent leur
/// nom actuel; les communes sont entièrement mises à jour.
pub async fn upsert_boundaries<C: GenericClient>(
    client: &C,
    schema: &str,
    set: &BoundarySet,
    report: &mut ImportReport,
) -> Result<(), tokio_postgres::Error> {
    let country_sql = format!(
        r#"
        INSERT INTO {}.country (name, code) VALUES ($1, $2)
        ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
        RETURNING id, (xmax = 0) AS inserted
        "#,
        schema
    );
    let row = client
        .query_one(country_sql.as_str(), &[&set.country_name, &set.country_pcode])
        .await?;
    let country_id: i32 = row.get("id");
    record_upsert(report, "country", &row);

    let region_sql = format!(
        r#"
        INSERT INTO {}.region
            (country_id, adm0_en, adm0_pcode, adm1_en, adm1_pcode,
             geo_json, date, valid_on, valid_to, area_sqkm)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (adm1_pcode) DO UPDATE SET
            country_id = EXCLUDED.country_id,
            geo_json = EXCLUDED.geo_json,
            date = EXCLUDED.date,
            valid_on = EXCLUDED.valid_on,
            valid_to = EXCLUDED.valid_to,
            area_sqkm = EXCLUDED.area_sqkm
        RETURNING id, (xmax = 0) AS inserted
        "#,
        schema
    );
    let stmt = client.prepare_cached(&region_sql).await?;
    let mut region_ids = HashMap::new();
    for region in &set.regions {
        let row = client
            .query_one(
                &stmt,
                &[
                    &country_id,
                    &region.parent_name,
                    &region.parent_pcode,
                    &region.name,
                    &region.pcode,
                    &region.geometry,
                    &region.validity.date,
                    &region.validity.valid_on,
                    &region.validity.valid_to,
                    &region.area_sqkm,
                ],
            )
            .await?;
        region_ids.insert(region.pcode.as_str(), row.get::<_, i32>("id"));
        record_upsert(report, "region", &row);
    }

    let department_sql = format!(
        r#"
        INSERT INTO {}.department
            (region_id, adm2_en, adm2_pcode, geo_json, date, valid_on, valid_to, area_sqkm)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (adm2_pcode) DO UPDATE SET
            region_id = EXCLUDED.region_id,
            geo_json = EXCLUDED.geo_json,
            date = EXCLUDED.date,
            valid_on = EXCLUDED.valid_on,
            valid_to = EXCLUDED.valid_to,
            area_sqkm = EXCLUDED.area_sqkm
        RETURNING id, (xmax = 0) AS inserted
        "#,
        schema
    );
    let stmt = client.prepare_cached(&department_sql).await?;
    let mut department_ids = HashMap::new();
    for department in &set.departments {
        let Some(region_id) = parent_id(&region_ids, department) else {
            continue;
        };
        let row = client
            .query_one(
                &stmt,
                &[
                    &region_id,
                    &department.name,
                    &department.pcode,
                    &department.geometry,
                    &department.validity.date,
                    &department.validity.valid_on,
                    &department.validity.valid_to,
                    &department.area_sqkm,
                ],
            )
            .await?;
        department_ids.insert(department.pcode.as_str(), row.get::<_, i32>("id"));
        record_upsert(report, "department", &row);
    }

    let commune_sql = format!(
        r#"
        INSERT INTO {}.commune
            (department_id, adm3_en, adm3_pcode, adm3_ref, real_name,
             geo_json, date, valid_on, valid_to, area_sqkm)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (adm3_pcode) DO UPDATE SET
            department_id = EXCLUDED.department_id,
            adm3_en = EXCLUDED.adm3_en,
            adm3_ref = EXCLUDED.adm3_ref,
            real_name = EXCLUDED.real_name,
            geo_json = EXCLUDED.geo_json,
            date = EXCLUDED.date,
            valid_on = EXCLUDED.valid_on,
            valid_to = EXCLUDED.valid_to,
            area_sqkm = EXCLUDED.area_sqkm
        RETURNING id, (xmax = 0) AS inserted
        "#,
        schema
    );
    let stmt = client.prepare_cached(&commune_sql).await?;
    for commune in &set.communes {
        let Some(&department_id) = department_ids.get(commune.department_pcode.as_str()) else {
            continue;
        };
        let real_name = commune.real_name.as_deref().unwrap_or(&commune.name);
        let row = client
            .query_one(
                &stmt,
                &[
                    &department_id,
                    &commune.name,
                    &commune.pcode,
                    &commune.adm3_ref,
                    &real_name,
                    &commune.geometry,
                    &commune.validity.date,
                    &commune.validity.valid_on,
                    &commune.validity.valid_to,
                    &commune.area_sqkm,
                ],
            )
            .await?;
        record_upsert(report, "commune", &row);
    }

    info!(
        regions = set.regions.len(),
        departments = set.departments.len(),
        communes = set.communes.len(),
        "Boundaries upserted"
    );
    Ok(())
}

fn parent_id(ids: &HashMap<&str, i32>, boundary: &AggregateBoundary) -> Option<i32> {
    let id = ids.get(boundary.parent_pcode.as_str()).copied();
    if id.is_none() {
        debug!(pcode = %boundary.pcode, parent = %boundary.parent_pcode, "Parent not upserted");
    }
    id
}
