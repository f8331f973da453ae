//! Command line interface for the `halflink` binary.
//!
//! Shared with the build script, which renders the man page from it, so this
//! module depends on nothing but `clap` and `std`.

use std::net::SocketAddr;

use clap::{Args, Parser, Subcommand};

/// Command line arguments for the `halflink` binary.
#[derive(Debug, Parser)]
#[command(
    name = "halflink",
    version,
    about = "Request/response client for half-duplex test links"
)]
pub struct Cli {
    /// Address of the link endpoint.
    #[arg(short, long, default_value = "127.0.0.1:7000")]
    pub addr: SocketAddr,

    /// Mode string sent when opening the link.
    #[arg(short, long, default_value = "ITHAKI")]
    pub mode: String,

    /// Largest accepted frame in bytes.
    #[arg(long, default_value_t = 1024 * 1024)]
    pub max_frame_length: usize,

    /// Request codes issued for this session.
    #[command(flatten)]
    pub codes: CodeArgs,

    /// Task to run.
    #[command(subcommand)]
    pub task: Task,
}

/// The six session request codes, in issue order.
#[derive(Debug, Args)]
pub struct CodeArgs {
    /// Echo request code.
    pub echo: String,
    /// Error-free image request code.
    pub image: String,
    /// Corrupted image request code.
    pub image_corrupt: String,
    /// GPS request code.
    pub gps: String,
    /// ACK result code.
    pub ack: String,
    /// NACK result code.
    pub nack: String,
}

/// How many items a repeating task fetches.
#[derive(Debug, Args)]
pub struct Repeat {
    /// Number of items to fetch.
    #[arg(short, long, conflicts_with = "seconds")]
    pub count: Option<usize>,

    /// Keep fetching for this many seconds.
    #[arg(short, long)]
    pub seconds: Option<u64>,
}

/// Tasks the binary can run.
#[derive(Debug, Subcommand)]
pub enum Task {
    /// Fetch plain echo packets.
    Echo(Repeat),
    /// Fetch checksummed echo packets with ACK/NACK retransmission.
    Arq {
        #[command(flatten)]
        repeat: Repeat,
        /// Give up on an item after this many retransmissions.
        #[arg(long)]
        max_retransmissions: Option<u32>,
    },
    /// Fetch JPEG images.
    Image {
        #[command(flatten)]
        repeat: Repeat,
        /// Use the corrupted image code.
        #[arg(long)]
        corrupt: bool,
        /// Camera directives such as `PTZ`, `L` or `M`.
        #[arg(long, value_delimiter = ',')]
        camera: Vec<String>,
    },
    /// Fetch a GPS tracking transmission.
    Gps {
        /// Stored route in `R=XPPPPLL` form.
        #[arg(long)]
        route: Option<String>,
        /// Also fetch the map image marking the selected fixes.
        #[arg(long)]
        trace: bool,
        /// Minimum seconds between traced fixes.
        #[arg(long, default_value_t = 10)]
        spacing: u64,
    },
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Task};

    const CODES: [&str; 6] = ["E0001", "M0002", "G0003", "P0004", "Q0005", "R0006"];

    #[test]
    fn parses_codes_and_task() {
        let args = ["halflink"].into_iter().chain(CODES).chain(["echo", "--count", "3"]);
        let cli = Cli::parse_from(args);
        assert_eq!(cli.codes.nack, "R0006");
        assert!(matches!(cli.task, Task::Echo(ref repeat) if repeat.count == Some(3)));
    }

    #[test]
    fn parses_camera_list() {
        let args = ["halflink", "--addr", "10.0.0.1:9000"]
            .into_iter()
            .chain(CODES)
            .chain(["image", "--corrupt", "--camera", "PTZ,L"]);
        let cli = Cli::parse_from(args);
        assert_eq!(cli.addr.port(), 9000);
        let Task::Image { corrupt, camera, .. } = cli.task else {
            panic!("expected image task");
        };
        assert!(corrupt);
        assert_eq!(camera, ["PTZ", "L"]);
    }

    #[test]
    fn count_conflicts_with_seconds() {
        let args = ["halflink"]
            .into_iter()
            .chain(CODES)
            .chain(["arq", "--count", "1", "--seconds", "5"]);
        assert!(Cli::try_parse_from(args).is_err());
    }
}
