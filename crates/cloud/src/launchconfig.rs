// Licensed under the Apache License, Version 2.0 (see LICENSE).

use base64::Engine;

/// Decides whether a launch configuration's user-data payload marks it as
/// belonging to `cluster_name`.
///
/// Launch configurations carry no tags, so membership is decided by
/// substring-matching an `INSTANCE_PREFIX` marker inside the decoded
/// user-data (§4.1). This is brittle by design — the original tool flags a
/// TODO to reintroduce a sturdier marker — so the match stays isolated
/// behind this one function rather than spreading the substring check
/// through the lister.
pub fn user_data_matches_cluster(user_data_base64: &str, cluster_name: &str) -> bool {
    let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(user_data_base64) else {
        return false;
    };
    let Ok(text) = String::from_utf8(decoded) else {
        return false;
    };
    let markers = [
        format!("\nINSTANCE_PREFIX: {cluster_name}\n"),
        format!("\nINSTANCE_PREFIX: '{cluster_name}'\n"),
    ];
    markers.iter().any(|m| text.contains(m.as_str()))
}
