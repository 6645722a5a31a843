//! Normalisation des en-têtes de colonnes
//!
//! Les fichiers saisis à la main ont des en-têtes accentués, ponctués et
//! espacés de façon irrégulière ("Taux d'Analphabétisme 10+",
//! "taux danalphabetisme 10plus"). Deux en-têtes sont identiques si leurs
//! formes normalisées sont égales.

/// Normalise un en-tête (ou une valeur de type "niveau") pour comparaison.
///
/// - minuscules, accents remplacés par substitution explicite
/// - `+` → `plus`, `%` → `percent`
/// - ponctuation (`.`, `-`, apostrophes, parenthèses, `/`, `\`) supprimée
/// - espaces et `_` supprimés
///
/// La fonction est idempotente.
pub fn normalize_header(header: &str) -> String {
    let mut out = String::with_capacity(header.len());

    for c in header.trim().chars().flat_map(char::to_lowercase) {
        match c {
            '+' => out.push_str("plus"),
            '%' => out.push_str("percent"),
            '.' | '-' | '\'' | '’' | '`' | '(' | ')' | '/' | '\\' | '_' => {}
            c if c.is_whitespace() => {}
            c => match fold_accent(c) {
                Some(folded) => out.push_str(folded),
                None => out.push(c),
            },
        }
    }

    out
}

/// Remplace une lettre accentuée (minuscule) par son équivalent ASCII
fn fold_accent(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => "a",
        'é' | 'è' | 'ê' | 'ë' => "e",
        'î' | 'ï' | 'í' | 'ì' => "i",
        'ô' | 'ö' | 'ó' | 'ò' | 'õ' => "o",
        'ù' | 'û' | 'ü' | 'ú' => "u",
        'ÿ' | 'ý' => "y",
        'ç' => "c",
        'ñ' => "n",
        'œ' => "oe",
        'æ' => "ae",
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accent_and_punctuation_insensitive() {
        assert_eq!(
            normalize_header("Taux d'Analphabétisme 10+"),
            normalize_header("taux danalphabetisme 10plus")
        );
        assert_eq!(normalize_header("Taux d'Analphabétisme 10+"), "tauxdanalphabetisme10plus");
    }

    #[test]
    fn test_spacing_and_case() {
        assert_eq!(normalize_header("  Total   Population "), "totalpopulation");
        assert_eq!(normalize_header("TOTAL_POPULATION"), "totalpopulation");
        assert_eq!(normalize_header("niveau_donnee"), normalize_header("Niveau donnée"));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(normalize_header("Population 15+"), "population15plus");
        assert_eq!(normalize_header("Pourcentage (%)"), "pourcentagepercent");
        assert_eq!(normalize_header("Marié(e)"), "mariee");
        assert_eq!(normalize_header("Taux 6-11 ans 2023/2024"), "taux611ans20232024");
    }

    #[test]
    fn test_uppercase_accents() {
        assert_eq!(normalize_header("ÉCOLE Œuvre"), "ecoleoeuvre");
        assert_eq!(normalize_header("Région"), "region");
        assert_eq!(normalize_header("Département"), "departement");
    }

    #[test]
    fn test_idempotent() {
        for raw in [
            "Taux d'Analphabétisme (15+)",
            "Male Population %",
            "Préscolaire",
            "Code-Région / ADM1",
        ] {
            let once = normalize_header(raw);
            assert_eq!(normalize_header(&once), once, "not idempotent for {raw}");
        }
    }
}
