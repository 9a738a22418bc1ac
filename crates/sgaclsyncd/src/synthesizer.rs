//! ASA ACL synthesizer
//!
//! Turns expanded policy content into ASA `access-list` statements. Rule
//! lines are ISE-supplied partial ACL fragments (`permit tcp`, `deny ip`)
//! and pass through verbatim; no syntax validation happens here.

use crate::types::{ExpandedPolicy, SynthesizedAcl};

/// Builds the ACL name and statement list for one expanded policy.
///
/// Name = cell name + `_` + rule-set name with all whitespace removed
/// (ASA object names cannot contain spaces). One statement per rule line,
/// in input order; an empty rule line yields a degenerate statement with
/// an empty fragment, matching what ISE stored.
pub fn synthesize(policy: &ExpandedPolicy) -> SynthesizedAcl {
    let name: String = format!("{}_{}", policy.cell_name, policy.rule_set_name)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let entries = policy
        .rule_lines
        .iter()
        .map(|line| {
            format!(
                "access-list {} extended {} security-group name {} any security-group name {} any",
                name, line, policy.source_sgt_name, policy.dest_sgt_name
            )
        })
        .collect();

    SynthesizedAcl { name, entries }
}
