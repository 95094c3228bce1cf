//! Bootstrap capture sequence.
//!
//! Once a session is ready, the usual first order of business is the same
//! every time: raise privileges, disable output paging, capture the running
//! configuration and the per-ONU status dump, and close the session. This
//! is caller policy layered on [`SessionHandle::run`], not part of the
//! session protocol itself.

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::model::{ConfigModel, OnuStatusTable};
use crate::parse::{parse_onu_detail, parse_running_config};
use crate::session::SessionHandle;

/// Parsed state captured from one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DeviceSnapshot {
    /// VLAN/port model from `show running-config`.
    pub config: ConfigModel,
    /// Per-ONU records from `show onu detail-info`.
    pub status: OnuStatusTable,
}

/// Runs the bootstrap sequence and parses the two captured dumps.
///
/// The sequence ends with `exit`, so the session's transport closes shortly
/// after the snapshot is returned.
pub async fn collect(handle: &SessionHandle) -> Result<DeviceSnapshot, SessionError> {
    handle.send("enable").await?;
    handle.send("terminal length 0").await?;
    let config_rx = handle.run("show running-config").await?;
    handle.send("conf term").await?;
    let status_rx = handle.run("show onu detail-info").await?;
    handle.send("exit").await?;

    let config_output = config_rx
        .await
        .map_err(|_| SessionError::SessionClosed)??;
    debug!("captured running config ({} bytes)", config_output.content.len());

    let status_output = status_rx
        .await
        .map_err(|_| SessionError::SessionClosed)??;
    debug!("captured onu detail info ({} bytes)", status_output.content.len());

    Ok(DeviceSnapshot {
        config: parse_running_config(&config_output.content),
        status: parse_onu_detail(&status_output.content),
    })
}
