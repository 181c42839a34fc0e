//! Species-link table: which model species are observed in the data.
//!
//! A [`SpeciesLink`] pairs every model species (in model axis order) with an
//! optional data column name. Linked species are the **observed** axes kept
//! by the tensor adapter; unlinked species are **unobserved** and summed out
//! of every probability and sensitivity tensor before alignment.
//!
//! Observed axes keep the model's species order, so the data tensor built
//! from the same link table has its count axes in the same order.
use serde::{Deserialize, Serialize};

use crate::likelihood::errors::{LikResult, LikelihoodError};

/// Mapping from model species to empirical data columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeciesLink {
    species: Vec<String>,
    links: Vec<Option<String>>,
}

impl SpeciesLink {
    /// Build a link table.
    ///
    /// # Errors
    /// - [`LikelihoodError::LinkLengthMismatch`] if the two lists differ in
    ///   length.
    /// - [`LikelihoodError::NoObservedSpecies`] if nothing is linked.
    /// - [`LikelihoodError::DuplicateLinkedColumn`] if a column is linked
    ///   twice.
    pub fn new(species: Vec<String>, links: Vec<Option<String>>) -> LikResult<Self> {
        if species.len() != links.len() {
            return Err(LikelihoodError::LinkLengthMismatch {
                species: species.len(),
                links: links.len(),
            });
        }
        let linked: Vec<&String> = links.iter().flatten().collect();
        if linked.is_empty() {
            return Err(LikelihoodError::NoObservedSpecies);
        }
        for (i, col) in linked.iter().enumerate() {
            if linked[..i].contains(col) {
                return Err(LikelihoodError::DuplicateLinkedColumn { column: (*col).clone() });
            }
        }
        Ok(Self { species, links })
    }

    /// Link every species to a data column of the same name.
    pub fn all_observed<S: AsRef<str>>(species: &[S]) -> LikResult<Self> {
        let names: Vec<String> = species.iter().map(|s| s.as_ref().to_string()).collect();
        let links = names.iter().cloned().map(Some).collect();
        Self::new(names, links)
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn n_species(&self) -> usize {
        self.species.len()
    }

    /// Model axes that are kept (linked to a data column), in model order.
    pub fn observed_axes(&self) -> Vec<usize> {
        self.links.iter().enumerate().filter_map(|(i, l)| l.as_ref().map(|_| i)).collect()
    }

    /// Model axes that are summed out.
    pub fn unobserved_axes(&self) -> Vec<usize> {
        self.links.iter().enumerate().filter_map(|(i, l)| l.is_none().then_some(i)).collect()
    }

    /// Data columns of the observed axes, in model order.
    pub fn data_columns(&self) -> Vec<&str> {
        self.links.iter().flatten().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Observed and unobserved axes partition the species in model order.
    //
    // Given
    // -----
    // - Species (offGene, onGene, rna) with only `rna` linked to "RNA_count".
    //
    // Expect
    // ------
    // - Observed axes [2], unobserved [0, 1], data columns ["RNA_count"].
    fn partitions_axes_in_model_order() {
        // Arrange
        let link = SpeciesLink::new(
            vec!["offGene".into(), "onGene".into(), "rna".into()],
            vec![None, None, Some("RNA_count".into())],
        )
        .expect("valid link table");

        // Act / Assert
        assert_eq!(link.observed_axes(), vec![2]);
        assert_eq!(link.unobserved_axes(), vec![0, 1]);
        assert_eq!(link.data_columns(), vec!["RNA_count"]);
    }

    #[test]
    // Purpose
    // -------
    // A table that observes nothing, or observes one column twice, is a
    // configuration error.
    //
    // Given
    // -----
    // - Two tables: all links `None`; both species linked to "x".
    //
    // Expect
    // ------
    // - `NoObservedSpecies` and `DuplicateLinkedColumn` respectively.
    fn rejects_empty_and_duplicate_links() {
        // Arrange / Act
        let none = SpeciesLink::new(vec!["a".into()], vec![None]);
        let dup = SpeciesLink::new(
            vec!["a".into(), "b".into()],
            vec![Some("x".into()), Some("x".into())],
        );

        // Assert
        assert_eq!(none.expect_err("nothing observed"), LikelihoodError::NoObservedSpecies);
        assert_eq!(
            dup.expect_err("duplicate column"),
            LikelihoodError::DuplicateLinkedColumn { column: "x".into() }
        );
    }
}
