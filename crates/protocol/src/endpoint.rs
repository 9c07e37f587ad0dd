/// Path of the build-number command, relative to the server base URL.
pub const NEXT_BUILD_NUM_PATH: &str = "/cmd/next_build_num";

/// Builds the request URL from a server base URL.
///
/// Exactly one trailing `/` is stripped so `http://host/` and `http://host`
/// address the same command.
pub fn next_build_num_url(server: &str) -> String {
    let base = server.strip_suffix('/').unwrap_or(server);
    format!("{}{}", base, NEXT_BUILD_NUM_PATH)
}
