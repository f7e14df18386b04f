//! Engine version and feature flags read from the engine Deployment

use cpstate_core::{ClientError, ClientResult, EngineInfo};
use serde_json::Value;

const FEATURE_FLAG_PREFIX: &str = "--enable-";

/// Tag of an image reference; digests and untagged images yield an empty tag
fn image_tag(image: &str) -> &str {
    let name = image.split('@').next().unwrap_or_default();
    let last_segment = name.rsplit('/').next().unwrap_or_default();
    last_segment
        .split_once(':')
        .map(|(_, tag)| tag)
        .unwrap_or_default()
}

/// Build [`EngineInfo`] from a Deployment object.
///
/// The version is the image tag of the first container; feature flags are
/// the container arguments starting with `--enable-`.
pub fn engine_info_from_deployment(deployment: &Value) -> ClientResult<EngineInfo> {
    let container = deployment
        .pointer("/spec/template/spec/containers/0")
        .ok_or_else(|| {
            ClientError::InvalidResource("engine deployment has no containers".to_string())
        })?;

    let image = container
        .get("image")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let version = image_tag(image);
    if version.is_empty() {
        return Err(ClientError::InvalidResource(format!(
            "cannot determine engine version from image {:?}",
            image
        )));
    }

    let feature_flags = container
        .get("args")
        .and_then(Value::as_array)
        .map(|args| {
            args.iter()
                .filter_map(Value::as_str)
                .filter(|arg| arg.starts_with(FEATURE_FLAG_PREFIX))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(EngineInfo {
        version: version.to_string(),
        feature_flags,
    })
}
