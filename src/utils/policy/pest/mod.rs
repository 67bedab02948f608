use pest::Parser;
use serde::{Serialize, Deserialize};
use crate::error::HabeError;

pub(crate) mod human;

use self::human::HumanPolicyParser;

/// A parsed access policy: a boolean formula over `name@authority`
/// attribute leaves.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub enum PolicyValue {
    Leaf(String),
    And(Vec<PolicyValue>),
    Or(Vec<PolicyValue>),
}

/// Parses a policy string into a [`PolicyValue`] tree.
///
/// The grammar is `disjunction := conjunction ("OR" conjunction)*`,
/// `conjunction := term ("AND" term)*`, `term := leaf | "(" disjunction ")"`,
/// so AND binds tighter than OR and parentheses override:
/// `A@X AND B@Y OR C@Z` parses as `(A@X AND B@Y) OR C@Z`.
///
/// Leaves are not checked for the `name@authority` shape here; that
/// validation happens during attribute extraction.
pub fn parse(policy: &str) -> Result<PolicyValue, HabeError> {
    use self::human::Rule;
    match HumanPolicyParser::parse(Rule::content, policy) {
        Ok(mut result) => Ok(human::parse(result.next().unwrap())),
        Err(e) => Err(e.into())
    }
}

/// Renders a policy tree back into its textual form, parenthesizing OR
/// gates nested under AND gates.
pub fn serialize_policy(val: &PolicyValue) -> String {
    match val {
        PolicyValue::Leaf(attribute) => attribute.clone(),
        PolicyValue::And(children) => {
            let rendered: Vec<String> = children.iter()
                .map(|child| match child {
                    PolicyValue::Or(_) => format!("({})", serialize_policy(child)),
                    _ => serialize_policy(child),
                })
                .collect();
            rendered.join(" AND ")
        },
        PolicyValue::Or(children) => {
            let rendered: Vec<String> = children.iter().map(serialize_policy).collect();
            rendered.join(" OR ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_parsing() {
        let pol = parse("Officer@Government").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::Leaf("Officer@Government".to_string()));
    }

    #[test]
    fn test_and_parsing() {
        let pol = parse("Doctor@Hospital AND Researcher@University").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::And(vec![
            PolicyValue::Leaf("Doctor@Hospital".to_string()),
            PolicyValue::Leaf("Researcher@University".to_string()),
        ]));
    }

    #[test]
    fn test_or_parsing() {
        let pol = parse("Doctor@Hospital OR Nurse@Hospital").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::Or(vec![
            PolicyValue::Leaf("Doctor@Hospital".to_string()),
            PolicyValue::Leaf("Nurse@Hospital".to_string()),
        ]));
    }

    #[test]
    fn test_precedence() {
        // AND binds tighter than OR
        let pol = parse("A@X AND B@Y OR C@Z").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::Or(vec![
            PolicyValue::And(vec![
                PolicyValue::Leaf("A@X".to_string()),
                PolicyValue::Leaf("B@Y".to_string()),
            ]),
            PolicyValue::Leaf("C@Z".to_string()),
        ]));
    }

    #[test]
    fn test_parentheses() {
        let pol = parse("A@X AND (B@Y OR C@Z)").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::And(vec![
            PolicyValue::Leaf("A@X".to_string()),
            PolicyValue::Or(vec![
                PolicyValue::Leaf("B@Y".to_string()),
                PolicyValue::Leaf("C@Z".to_string()),
            ]),
        ]));
    }

    #[test]
    fn test_serialize_roundtrip() {
        for policy in [
            "Officer@Government",
            "Doctor@Hospital AND Researcher@University",
            "A@X AND (B@Y OR C@Z)",
            "A@X AND B@Y OR C@Z",
        ] {
            let parsed = parse(policy).expect("unsuccessful parse");
            let rendered = serialize_policy(&parsed);
            assert_eq!(parse(&rendered).expect("unsuccessful reparse"), parsed);
        }
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(parse("").is_err());
        assert!(parse("A@X AND").is_err());
        assert!(parse("AND A@X").is_err());
        assert!(parse("(A@X OR B@Y").is_err());
    }

    #[test]
    fn test_leaf_shape_not_enforced_by_parser() {
        // shape validation is the extraction step's job
        let pol = parse("not-an-attribute").expect("unsuccessful parse");
        assert_eq!(pol, PolicyValue::Leaf("not-an-attribute".to_string()));
    }
}
