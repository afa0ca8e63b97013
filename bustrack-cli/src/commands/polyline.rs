//! Polyline command - decode an encoded route polyline.

use bustrack::coord::{decode_polyline, path_length_m, safe_polyline};
use clap::Args;

use crate::error::CliError;

/// Arguments for the polyline command.
#[derive(Debug, Args)]
pub struct PolylineArgs {
    /// Encoded polyline (precision 1e5)
    pub encoded: String,

    /// Print the points as a JSON array
    #[arg(long)]
    pub json: bool,
}

/// Run the polyline command.
pub fn run(args: PolylineArgs) -> Result<(), CliError> {
    let decoded = decode_polyline(&args.encoded)?;
    let points = safe_polyline(&decoded);
    let dropped = decoded.len() - points.len();

    if args.json {
        let json = serde_json::to_string(&points).map_err(|e| CliError::Runtime(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    for (i, point) in points.iter().enumerate() {
        println!("{:>4}  {}", i, point);
    }
    println!();
    println!(
        "{} point(s), {:.0} m along the path",
        points.len(),
        path_length_m(&points)
    );
    if dropped > 0 {
        println!("{} invalid point(s) dropped", dropped);
    }

    Ok(())
}
