//! Disjunctive normal form of access policies, backing the conjunctive
//! key wrapping mode.
use std::collections::BTreeSet;
use super::pest::PolicyValue;

/// An access policy flattened into OR-of-AND terms: the policy is
/// satisfied if every attribute of at least one term is held.
#[derive(PartialEq, Clone, Debug)]
pub struct DnfPolicy {
    pub terms: Vec<BTreeSet<String>>,
}

impl DnfPolicy {
    /// Normalizes a parsed policy tree into its minimal DNF.
    ///
    /// Terms are sorted, duplicates removed, and any term that is a
    /// strict superset of another dropped: such a term can never be the
    /// cheapest way to satisfy the policy.
    pub fn from_policy(policy: &PolicyValue) -> DnfPolicy {
        let mut terms = expand(policy);
        terms.sort();
        terms.dedup();
        let minimal: Vec<BTreeSet<String>> = terms
            .iter()
            .filter(|term| !terms.iter().any(|other| other != *term && other.is_subset(term)))
            .cloned()
            .collect();
        DnfPolicy { terms: minimal }
    }

    /// Canonical label of a term: its attributes in lexicographic order
    /// joined by `" AND "`. Conjunctive ciphertexts key their wrapped
    /// data keys by this label.
    pub fn label(term: &BTreeSet<String>) -> String {
        term.iter().cloned().collect::<Vec<String>>().join(" AND ")
    }

    /// The first term (in sorted order) fully covered by `available`.
    pub fn satisfied_term(&self, available: &BTreeSet<String>) -> Option<&BTreeSet<String>> {
        self.terms.iter().find(|term| term.is_subset(available))
    }
}

fn expand(policy: &PolicyValue) -> Vec<BTreeSet<String>> {
    match policy {
        PolicyValue::Leaf(attribute) => vec![BTreeSet::from([attribute.clone()])],
        PolicyValue::Or(children) => children.iter().flat_map(expand).collect(),
        PolicyValue::And(children) => {
            // cartesian product of the children's term lists
            let mut terms: Vec<BTreeSet<String>> = vec![BTreeSet::new()];
            for child in children {
                let child_terms = expand(child);
                let mut product = Vec::new();
                for term in &terms {
                    for child_term in &child_terms {
                        let mut merged = term.clone();
                        merged.extend(child_term.iter().cloned());
                        product.push(merged);
                    }
                }
                terms = product;
            }
            terms
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::policy::pest::parse;

    fn term(attributes: &[&str]) -> BTreeSet<String> {
        attributes.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn single_leaf() {
        let dnf = DnfPolicy::from_policy(&parse("A@X").unwrap());
        assert_eq!(dnf.terms, vec![term(&["A@X"])]);
    }

    #[test]
    fn conjunction_is_one_term() {
        let dnf = DnfPolicy::from_policy(&parse("A@X AND B@Y").unwrap());
        assert_eq!(dnf.terms, vec![term(&["A@X", "B@Y"])]);
    }

    #[test]
    fn disjunction_splits_terms() {
        let dnf = DnfPolicy::from_policy(&parse("A@X OR B@Y").unwrap());
        assert_eq!(dnf.terms, vec![term(&["A@X"]), term(&["B@Y"])]);
    }

    #[test]
    fn and_distributes_over_or() {
        let dnf = DnfPolicy::from_policy(&parse("A@X AND (B@Y OR C@Z)").unwrap());
        assert_eq!(dnf.terms, vec![term(&["A@X", "B@Y"]), term(&["A@X", "C@Z"])]);
    }

    #[test]
    fn superset_terms_pruned() {
        // A@X alone already satisfies, so the A@X AND B@Y term is redundant
        let dnf = DnfPolicy::from_policy(&parse("A@X OR (A@X AND B@Y)").unwrap());
        assert_eq!(dnf.terms, vec![term(&["A@X"])]);
    }

    #[test]
    fn labels_are_canonical() {
        let dnf = DnfPolicy::from_policy(&parse("B@Y AND A@X").unwrap());
        assert_eq!(DnfPolicy::label(&dnf.terms[0]), "A@X AND B@Y");
    }

    #[test]
    fn satisfied_term_lookup() {
        let dnf = DnfPolicy::from_policy(&parse("A@X AND B@Y OR C@Z").unwrap());
        assert_eq!(dnf.satisfied_term(&term(&["C@Z"])), Some(&term(&["C@Z"])));
        assert_eq!(dnf.satisfied_term(&term(&["A@X"])), None);
        assert_eq!(dnf.satisfied_term(&term(&["A@X", "B@Y"])), Some(&term(&["A@X", "B@Y"])));
    }
}
