use std::path::Path;

/// Best-effort discovery of a reachable container runtime socket, tried in
/// order: explicit `DOCKER_HOST`, then common Podman/Docker socket paths.
/// Adapted from the teacher's `tests/testcontainers.rs`, minus its
/// uid-specific Podman path (would need an extra `nix` dependency this
/// pipeline has no other use for).
#[must_use]
#[allow(dead_code)]
pub fn find_container_runtime() -> Option<String> {
    if let Ok(existing) = std::env::var("DOCKER_HOST") {
        if !existing.is_empty() && socket_exists(&existing) {
            return Some(existing);
        }
    }

    let candidates = [
        "unix:///run/podman/podman.sock",
        "unix:///var/run/podman/podman.sock",
        "unix:///var/run/docker.sock",
    ];

    candidates.into_iter().find(|c| socket_exists(c)).map(str::to_string)
}

fn socket_exists(host: &str) -> bool {
    host.strip_prefix("unix://").is_none_or(|path| Path::new(path).exists())
}
