use crate::utils::policy::pest::PolicyValue;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "habe.policy.pest"]
pub(crate) struct HumanPolicyParser;

pub(crate) fn parse(pair: Pair<Rule>) -> PolicyValue {
    match pair.as_rule() {
        Rule::leaf => PolicyValue::Leaf(pair.as_str().to_string()),
        Rule::conjunction => gate(pair, true),
        Rule::disjunction => gate(pair, false),
        Rule::name
        | Rule::namechar
        | Rule::term
        | Rule::content
        | Rule::AND
        | Rule::OR
        | Rule::BRACEOPEN
        | Rule::BRACECLOSE
        | Rule::EOI
        | Rule::WHITESPACE => unreachable!(),
    }
}

// single-child gates collapse so that "A@X" parses to a bare leaf
fn gate(pair: Pair<Rule>, conjunction: bool) -> PolicyValue {
    let mut children: Vec<PolicyValue> = pair.into_inner().map(parse).collect();
    if children.len() == 1 {
        children.remove(0)
    } else if conjunction {
        PolicyValue::And(children)
    } else {
        PolicyValue::Or(children)
    }
}
