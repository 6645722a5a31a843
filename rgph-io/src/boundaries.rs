//! Limites administratives au format GeoJSON
//!
//! Le fichier source est une FeatureCollection de communes (ADM3). Chaque
//! feature porte aussi les codes et noms de sa région (ADM1) et de son
//! département (ADM2): les niveaux supérieurs sont reconstruits en agrégeant
//! les communes (multipolygone des polygones, somme des surfaces).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use geo::{ChamberlainDuquetteArea, Geometry, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonObject};
use serde_json::Value;
use tracing::{debug, warn};

use crate::TabularError;

/// Code pays par défaut si le fichier n'en fournit pas
pub const DEFAULT_COUNTRY_CODE: &str = "MR";
/// Nom du pays par défaut
pub const DEFAULT_COUNTRY_NAME: &str = "Mauritania";

/// Dates de validité communes à tous les niveaux
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Validity {
    pub date: NaiveDate,
    pub valid_on: NaiveDate,
    /// `None` = toujours valide
    pub valid_to: Option<NaiveDate>,
}

/// Commune telle que lue dans une feature
#[derive(Debug, Clone)]
pub struct CommuneBoundary {
    pub pcode: String,
    pub name: String,
    pub adm3_ref: Option<String>,
    pub real_name: Option<String>,
    pub department_pcode: String,
    pub department_name: String,
    pub region_pcode: String,
    pub region_name: String,
    pub country_pcode: String,
    pub country_name: String,
    /// Géométrie GeoJSON d'origine
    pub geometry: Value,
    pub validity: Validity,
    pub area_sqkm: f64,
}

/// Région ou département reconstruit à partir de ses communes
#[derive(Debug, Clone)]
pub struct AggregateBoundary {
    pub pcode: String,
    pub name: String,
    /// Code du niveau parent (pays pour une région, région pour un département)
    pub parent_pcode: String,
    pub parent_name: String,
    /// MultiPolygon GeoJSON
    pub geometry: Value,
    pub validity: Validity,
    pub area_sqkm: f64,
    pub communes: usize,
}

/// Résultat du parsing d'un fichier de limites
#[derive(Debug, Default)]
pub struct BoundarySet {
    pub country_pcode: String,
    pub country_name: String,
    pub regions: Vec<AggregateBoundary>,
    pub departments: Vec<AggregateBoundary>,
    pub communes: Vec<CommuneBoundary>,
    /// Features ignorées (propriété manquante, géométrie invalide...)
    pub errors: Vec<TabularError>,
}

impl BoundarySet {
    pub fn is_empty(&self) -> bool {
        self.communes.is_empty()
    }
}

/// Parse une FeatureCollection de communes
pub fn parse_boundaries(bytes: &[u8]) -> Result<BoundarySet, TabularError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| TabularError::GeoJson(format!("invalid UTF-8: {}", e)))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| TabularError::GeoJson(e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(TabularError::GeoJson("expected a FeatureCollection".into()));
    };

    let mut set = BoundarySet::default();
    let mut polygons: Vec<Vec<Polygon<f64>>> = Vec::with_capacity(collection.features.len());

    for (idx, feature) in collection.features.iter().enumerate() {
        match parse_commune(idx, feature) {
            Ok((commune, shape)) => {
                set.communes.push(commune);
                polygons.push(shape);
            }
            Err(e) => {
                warn!(feature = idx, error = %e, "Feature skipped");
                set.errors.push(e);
            }
        }
    }

    if let Some(first) = set.communes.first() {
        set.country_pcode = first.country_pcode.clone();
        set.country_name = first.country_name.clone();
    } else {
        set.country_pcode = DEFAULT_COUNTRY_CODE.to_string();
        set.country_name = DEFAULT_COUNTRY_NAME.to_string();
    }

    set.departments = aggregate(&set.communes, &polygons, |c| {
        (
            c.department_pcode.as_str(),
            c.department_name.as_str(),
            c.region_pcode.as_str(),
            c.region_name.as_str(),
        )
    })?;
    set.regions = aggregate(&set.communes, &polygons, |c| {
        (
            c.region_pcode.as_str(),
            c.region_name.as_str(),
            c.country_pcode.as_str(),
            c.country_name.as_str(),
        )
    })?;

    debug!(
        communes = set.communes.len(),
        departments = set.departments.len(),
        regions = set.regions.len(),
        skipped = set.errors.len(),
        "Boundaries parsed"
    );
    Ok(set)
}

fn parse_commune(
    idx: usize,
    feature: &Feature,
) -> Result<(CommuneBoundary, Vec<Polygon<f64>>), TabularError> {
    let props = feature
        .properties
        .as_ref()
        .ok_or_else(|| TabularError::invalid_property(idx, "properties", "missing"))?;

    let geometry = feature
        .geometry
        .as_ref()
        .ok_or_else(|| TabularError::invalid_property(idx, "geometry", "missing"))?;
    let shape: Geometry<f64> = Geometry::try_from(geometry.clone())
        .map_err(|e: geojson::Error| TabularError::invalid_property(idx, "geometry", e.to_string()))?;
    let shape = polygons_of(shape)
        .ok_or_else(|| TabularError::invalid_property(idx, "geometry", "not a polygon"))?;

    let area_sqkm = match optional_number(idx, props, "AREA_SQKM")? {
        Some(area) => area,
        None => spherical_area_sqkm(&shape),
    };

    let validity = Validity {
        date: required_date(idx, props, "date")?,
        valid_on: required_date(idx, props, "validOn")?,
        valid_to: optional_date(idx, props, "validTo")?,
    };

    let commune = CommuneBoundary {
        pcode: required_text(idx, props, "ADM3_PCODE")?,
        name: required_text(idx, props, "ADM3_EN")?,
        adm3_ref: optional_text(props, "ADM3_REF"),
        real_name: optional_text(props, "real_name"),
        department_pcode: required_text(idx, props, "ADM2_PCODE")?,
        department_name: required_text(idx, props, "ADM2_EN")?,
        region_pcode: required_text(idx, props, "ADM1_PCODE")?,
        region_name: required_text(idx, props, "ADM1_EN")?,
        country_pcode: optional_text(props, "ADM0_PCODE")
            .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
        country_name: optional_text(props, "ADM0_EN")
            .unwrap_or_else(|| DEFAULT_COUNTRY_NAME.to_string()),
        geometry: serde_json::to_value(geometry)?,
        validity,
        area_sqkm,
    };

    Ok((commune, shape))
}

/// Regroupe les communes par code (clé, nom, code parent, nom parent).
/// Les dates et le nom viennent de la première commune rencontrée.
fn aggregate<'a, F>(
    communes: &'a [CommuneBoundary],
    polygons: &[Vec<Polygon<f64>>],
    key: F,
) -> Result<Vec<AggregateBoundary>, TabularError>
where
    F: Fn(&'a CommuneBoundary) -> (&'a str, &'a str, &'a str, &'a str),
{
    let mut groups: BTreeMap<&str, (AggregateBoundary, Vec<Polygon<f64>>)> = BTreeMap::new();

    for (commune, shape) in communes.iter().zip(polygons) {
        let (pcode, name, parent_pcode, parent_name) = key(commune);
        let entry = groups.entry(pcode).or_insert_with(|| {
            (
                AggregateBoundary {
                    pcode: pcode.to_string(),
                    name: name.to_string(),
                    parent_pcode: parent_pcode.to_string(),
                    parent_name: parent_name.to_string(),
                    geometry: Value::Null,
                    validity: commune.validity,
                    area_sqkm: 0.0,
                    communes: 0,
                },
                Vec::new(),
            )
        });
        entry.0.area_sqkm += commune.area_sqkm;
        entry.0.communes += 1;
        entry.1.extend(shape.iter().cloned());
    }

    groups
        .into_values()
        .map(|(mut boundary, shape)| {
            boundary.geometry = multipolygon_to_json(MultiPolygon::new(shape))?;
            Ok(boundary)
        })
        .collect()
}

/// Polygones d'une géométrie surfacique
fn polygons_of(geometry: Geometry<f64>) -> Option<Vec<Polygon<f64>>> {
    match geometry {
        Geometry::Polygon(p) => Some(vec![p]),
        Geometry::MultiPolygon(mp) => Some(mp.0),
        Geometry::GeometryCollection(gc) => {
            let mut out = Vec::new();
            for g in gc.0 {
                out.extend(polygons_of(g)?);
            }
            Some(out)
        }
        _ => None,
    }
}

/// Surface sphérique en km² (coordonnées WGS84)
pub fn spherical_area_sqkm(polygons: &[Polygon<f64>]) -> f64 {
    polygons
        .iter()
        .map(|p| p.chamberlain_duquette_unsigned_area())
        .sum::<f64>()
        / 1_000_000.0
}

/// Sérialise un multipolygone en géométrie GeoJSON
pub fn multipolygon_to_json(multi: MultiPolygon<f64>) -> Result<Value, TabularError> {
    let geometry = geojson::Geometry::new(geojson::Value::from(&multi));
    Ok(serde_json::to_value(geometry)?)
}

fn raw_text(props: &JsonObject, key: &str) -> Option<String> {
    match props.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && s != "None").then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(props: &JsonObject, key: &str) -> Option<String> {
    raw_text(props, key)
}

fn required_text(idx: usize, props: &JsonObject, key: &str) -> Result<String, TabularError> {
    raw_text(props, key).ok_or_else(|| TabularError::invalid_property(idx, key, "missing"))
}

fn optional_number(idx: usize, props: &JsonObject, key: &str) -> Result<Option<f64>, TabularError> {
    match props.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() || s.trim() == "None" => Ok(None),
        Some(Value::String(s)) => fast_float::parse::<f64, _>(s.trim())
            .map(Some)
            .map_err(|_| TabularError::invalid_property(idx, key, format!("not a number: {}", s))),
        Some(other) => Err(TabularError::invalid_property(
            idx,
            key,
            format!("not a number: {}", other),
        )),
    }
}

fn optional_date(
    idx: usize,
    props: &JsonObject,
    key: &str,
) -> Result<Option<NaiveDate>, TabularError> {
    let Some(raw) = raw_text(props, key) else {
        return Ok(None);
    };
    // Les exports OCHA ajoutent parfois une heure: "2017-12-04T00:00:00"
    let day = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| TabularError::invalid_property(idx, key, format!("{}: {}", raw, e)))
}

fn required_date(idx: usize, props: &JsonObject, key: &str) -> Result<NaiveDate, TabularError> {
    optional_date(idx, props, key)?
        .ok_or_else(|| TabularError::invalid_property(idx, key, "missing"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(commune: &str, dept: &str, region: &str, x: f64, area: &str) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{
                "ADM0_EN":"Mauritania","ADM0_PCODE":"MR",
                "ADM1_EN":"Region {region}","ADM1_PCODE":"{region}",
                "ADM2_EN":"Dept {dept}","ADM2_PCODE":"{dept}",
                "ADM3_EN":"Commune {commune}","ADM3_PCODE":"{commune}",
                "ADM3_REF":"None","real_name":"Commune {commune}",
                "date":"2017-12-04","validOn":"2018-01-22","validTo":"None",
                "AREA_SQKM":{area}}},
              "geometry":{{"type":"Polygon","coordinates":[[[{x},18.0],[{x1},18.0],[{x1},19.0],[{x},19.0],[{x},18.0]]]}}}}"#,
            x1 = x + 1.0
        )
    }

    fn collection(features: &[String]) -> Vec<u8> {
        format!(
            r#"{{"type":"FeatureCollection","features":[{}]}}"#,
            features.join(",")
        )
        .into_bytes()
    }

    #[test]
    fn test_parse_and_aggregate() {
        let data = collection(&[
            feature("MR01101", "MR011", "MR01", -10.0, "12.5"),
            feature("MR01102", "MR011", "MR01", -9.0, "7.5"),
            feature("MR02101", "MR021", "MR02", -8.0, "3"),
        ]);
        let set = parse_boundaries(&data).unwrap();

        assert_eq!(set.country_pcode, "MR");
        assert_eq!(set.communes.len(), 3);
        assert_eq!(set.departments.len(), 2);
        assert_eq!(set.regions.len(), 2);
        assert!(set.errors.is_empty());

        let commune = &set.communes[0];
        assert_eq!(commune.adm3_ref, None);
        assert_eq!(commune.validity.valid_to, None);
        assert_eq!(
            commune.validity.valid_on,
            NaiveDate::from_ymd_opt(2018, 1, 22).unwrap()
        );

        let dept = &set.departments[0];
        assert_eq!(dept.pcode, "MR011");
        assert_eq!(dept.parent_pcode, "MR01");
        assert_eq!(dept.communes, 2);
        assert!((dept.area_sqkm - 20.0).abs() < 1e-9);
        assert_eq!(dept.geometry["type"], "MultiPolygon");
        assert_eq!(dept.geometry["coordinates"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_area_computed_when_absent() {
        let data = collection(&[feature("MR01101", "MR011", "MR01", -10.0, "null")]);
        let set = parse_boundaries(&data).unwrap();
        // Un degré sur un degré vers 18°N: environ 11 700 km²
        let area = set.communes[0].area_sqkm;
        assert!(area > 11_000.0 && area < 12_500.0, "area = {}", area);
    }

    #[test]
    fn test_malformed_feature_skipped() {
        let broken = r#"{"type":"Feature","properties":{"ADM3_PCODE":"MR09901"},
            "geometry":{"type":"Point","coordinates":[0.0,0.0]}}"#
            .to_string();
        let data = collection(&[broken, feature("MR01101", "MR011", "MR01", -10.0, "1")]);
        let set = parse_boundaries(&data).unwrap();
        assert_eq!(set.communes.len(), 1);
        assert_eq!(set.errors.len(), 1);
    }

    #[test]
    fn test_not_a_collection() {
        let data = br#"{"type":"Point","coordinates":[0.0,0.0]}"#;
        assert!(matches!(parse_boundaries(data), Err(TabularError::GeoJson(_))));
    }
}
