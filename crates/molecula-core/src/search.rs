//! Drug database search.
//!
//! No compound database is wired in; every search answers with the same
//! two reference compounds regardless of query or search type.

use molecula_types::{DrugSearchResult, SearchType};

/// Search the drug database.
pub fn search_drugs(query: &str, search_type: SearchType) -> Vec<DrugSearchResult> {
    tracing::debug!(query, search_type = search_type.as_str(), "Drug database search");
    reference_compounds()
}

fn reference_compounds() -> Vec<DrugSearchResult> {
    vec![
        compound(2244, "Aspirin", "C9H8O4", 180.16, "CC(=O)OC1=CC=CC=C1C(=O)O"),
        compound(3672, "Ibuprofen", "C13H18O2", 206.29, "CC(C)CC1=CC=C(C=C1)C(C)C(=O)O"),
    ]
}

fn compound(cid: u32, name: &str, formula: &str, weight: f64, smiles: &str) -> DrugSearchResult {
    DrugSearchResult {
        id: cid,
        name: name.to_owned(),
        formula: formula.to_owned(),
        molecular_weight: weight,
        smiles: smiles.to_owned(),
        category: "NSAID".to_owned(),
        image: format!("https://pubchem.ncbi.nlm.nih.gov/image/imgsrv.fcgi?cid={cid}&t=l"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_are_fixed() {
        let by_name = search_drugs("aspirin", SearchType::Name);
        let by_formula = search_drugs("C13H18O2", SearchType::Formula);
        assert_eq!(by_name, by_formula);

        let ids: Vec<u32> = by_name.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2244, 3672]);
        assert!(by_name.first().is_some_and(|r| r.name == "Aspirin"
            && r.image.ends_with("cid=2244&t=l")));
    }
}
