use clap::Parser;

/// Request the next build number for a manifest version and write it back
///
/// Reads the first Version="A.B.C.D" tag from the manifest, asks the build
/// server for the next build number of A.B.C and rewrites the tag in place.
#[derive(Debug, Parser)]
#[command(
    name = "buildnum",
    version,
    verbatim_doc_comment,
    args_override_self = true,
    override_usage = "buildnum -c <commit> -f <manifest file> -p <product> -s <server>"
)]
pub struct Cli {
    /// Commit id sent to the build server
    #[arg(short, long, value_name = "COMMIT", allow_hyphen_values = true)]
    pub commit: Option<String>,

    /// Manifest file holding the Version="A.B.C.D" tag (required)
    #[arg(short, long, value_name = "MANIFEST_FILE", allow_hyphen_values = true)]
    pub file: Option<String>,

    /// Product name that scopes the build number sequence
    #[arg(short, long, value_name = "PRODUCT", allow_hyphen_values = true)]
    pub product: Option<String>,

    /// Build server base URL (required)
    #[arg(short, long, value_name = "SERVER", allow_hyphen_values = true)]
    pub server: Option<String>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long)]
    pub log_level: Option<String>,
}
