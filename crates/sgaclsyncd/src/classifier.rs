//! Syslog message classifier
//!
//! ISE emits a high volume of syslog traffic; only "egress matrix cell added
//! via ERS" change notices are of interest. A payload matches only when all
//! three marker substrings are present. Everything else is silently ignored.

use crate::types::BulkOperationId;

/// Change-notice marker for an added configuration object
const MARKER_CONFIG_ADDED: &str = "52000 NOTICE Configuration-Changes: Added configuration";

/// The change came in through the ERS admin interface
const MARKER_ADMIN_ERS: &str = "AdminInterface=ERS";

/// The changed object is an egress matrix cell
const MARKER_MEDIA_TYPE: &str = "mediaType=vnd.com.cisco.ise.trustsec.egressmatrixcell.1.0+xml";

/// Token preceding the bulk operation id in the payload
const BULK_ID_TOKEN: &str = "bulkId=";

/// Classifies one syslog payload.
///
/// Returns the bulk operation id when the payload announces a newly created
/// egress matrix cell, `None` otherwise. Payloads are escaped text; the id
/// runs from `bulkId=` to the first literal backslash. A match whose id is
/// absent or empty is treated as a non-match, since an empty id can never
/// resolve.
pub fn classify(payload: &str) -> Option<BulkOperationId> {
    if !payload.contains(MARKER_CONFIG_ADDED)
        || !payload.contains(MARKER_ADMIN_ERS)
        || !payload.contains(MARKER_MEDIA_TYPE)
    {
        return None;
    }

    let tail = match payload.split_once(BULK_ID_TOKEN) {
        Some((_, tail)) => tail,
        None => {
            tracing::warn!("Egress cell notification without a bulkId token, skipping");
            return None;
        }
    };

    let raw = tail.split('\\').next().unwrap_or("");
    match BulkOperationId::new(raw) {
        Some(id) => Some(id),
        None => {
            tracing::warn!("Egress cell notification with an empty bulkId, skipping");
            None
        }
    }
}
