//! Access policy parsing and evaluation.
pub mod dnf;
pub mod pest;

use std::collections::BTreeSet;
use crate::error::HabeError;
use self::pest::PolicyValue;

/// Splits an attribute string into its `(name, authority)` parts.
///
/// Fails with [`HabeError::PolicyFormat`] unless the string contains
/// exactly one `@` with non-empty halves.
pub fn parse_attribute(attribute: &str) -> Result<(String, String), HabeError> {
    let mut parts = attribute.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(authority), None) if !name.is_empty() && !authority.is_empty() => {
            Ok((name.to_string(), authority.to_string()))
        },
        _ => Err(HabeError::PolicyFormat(
            format!("attribute '{}' does not match name@authority", attribute)
        ))
    }
}

/// Collects the deduplicated leaf attributes of a policy tree.
///
/// This is where the `name@authority` shape is enforced; the parser
/// itself accepts any bare name as a leaf.
pub fn leaves(policy: &PolicyValue) -> Result<BTreeSet<String>, HabeError> {
    let mut attributes = BTreeSet::new();
    collect_leaves(policy, &mut attributes)?;
    Ok(attributes)
}

fn collect_leaves(policy: &PolicyValue, attributes: &mut BTreeSet<String>) -> Result<(), HabeError> {
    match policy {
        PolicyValue::Leaf(attribute) => {
            parse_attribute(attribute)?;
            attributes.insert(attribute.clone());
            Ok(())
        },
        PolicyValue::And(children) | PolicyValue::Or(children) => {
            for child in children {
                collect_leaves(child, attributes)?;
            }
            Ok(())
        }
    }
}

/// Returns the subset of `available` that contributes to satisfying
/// `policy`, or the empty set if the policy is not satisfied.
///
/// * a leaf is satisfied if it is contained in `available`
/// * an OR gate collects the union of its satisfied children
/// * an AND gate requires every child to be satisfied and aborts on the
///   first child that is not, discarding partial sibling matches
///
/// Iteration order of the returned set is lexicographic, which is what
/// makes the decryption representative (its smallest element)
/// deterministic.
pub fn satisfying_attributes(policy: &PolicyValue, available: &BTreeSet<String>) -> BTreeSet<String> {
    match policy {
        PolicyValue::Leaf(attribute) => {
            if available.contains(attribute) {
                BTreeSet::from([attribute.clone()])
            } else {
                BTreeSet::new()
            }
        },
        PolicyValue::Or(children) => {
            let mut satisfying = BTreeSet::new();
            for child in children {
                satisfying.extend(satisfying_attributes(child, available));
            }
            satisfying
        },
        PolicyValue::And(children) => {
            let mut satisfying = BTreeSet::new();
            for child in children {
                let from_child = satisfying_attributes(child, available);
                if from_child.is_empty() {
                    return BTreeSet::new();
                }
                satisfying.extend(from_child);
            }
            satisfying
        }
    }
}
