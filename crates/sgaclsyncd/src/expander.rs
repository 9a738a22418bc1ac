//! Policy expander
//!
//! Resolves a freshly created egress matrix cell into the data needed for
//! ACL synthesis: the cell itself, its two SGTs, and the rule lines of
//! every referenced SGACL. The cell must be fetched first since the other
//! ids are embedded in it; the two SGT fetches are independent and run
//! concurrently.

use crate::error::{Result, SgaclSyncError};
use crate::ers::ErsApi;
use crate::types::{ExpandedPolicy, ResourceId};
use tracing::info;

/// Expands one egress cell into its full policy content.
///
/// Rule lines accumulate across all referenced SGACLs in cell order,
/// splitting each `aclcontent` on newlines. Empty lines from trailing
/// newlines are kept; the synthesizer passes rule fragments through
/// verbatim and downstream sees exactly what ISE stored. With multiple
/// SGACLs, `rule_set_name` is the last one's name (cells carry a single
/// SGACL in practice).
pub async fn expand(api: &dyn ErsApi, cell_id: &ResourceId) -> Result<ExpandedPolicy> {
    let cell = api.egress_cell(cell_id.as_str()).await?;
    if cell.sgacl_ids.is_empty() {
        return Err(SgaclSyncError::Envelope {
            resource: "EgressMatrixCell",
            detail: format!("cell {} references no SGACLs", cell.id),
        });
    }

    info!(cell = %cell.name, "Egress matrix cell added");

    let (source_sgt, dest_sgt) = tokio::try_join!(
        api.sgt(&cell.source_sgt_id),
        api.sgt(&cell.destination_sgt_id)
    )?;

    info!(
        cell = %cell.name,
        source_sgt = %source_sgt.name,
        dest_sgt = %dest_sgt.name,
        "Resolved cell SGTs"
    );

    let mut rule_lines = Vec::new();
    let mut rule_set_name = String::new();
    for sgacl_id in &cell.sgacl_ids {
        let sgacl = api.sgacl(sgacl_id).await?;
        rule_lines.extend(sgacl.acl_content.split('\n').map(str::to_string));
        rule_set_name = sgacl.name;
    }

    info!(cell = %cell.name, sgacl = %rule_set_name, lines = rule_lines.len(), "Resolved cell SGACLs");

    Ok(ExpandedPolicy {
        cell_name: cell.name,
        source_sgt_name: source_sgt.name,
        dest_sgt_name: dest_sgt.name,
        rule_set_name,
        rule_lines,
    })
}
