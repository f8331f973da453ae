//! `halflink` binary: runs one task against a TCP link endpoint.

mod cli;

use std::{error::Error, time::Duration};

use clap::Parser;
use halflink::{
    codes::{CameraCommand, RequestCode, RequestCodes},
    config::{LinkConfig, RetryConfig},
    decode::TraceOptions,
    driver::{RunError, RunOptions},
    session::Session,
    sink::LogSink,
    transport::TcpDialer,
};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, CodeArgs, Repeat, Task};

fn request_codes(args: CodeArgs) -> Result<RequestCodes, Box<dyn Error>> {
    Ok(RequestCodes {
        echo: RequestCode::new(args.echo)?,
        image: RequestCode::new(args.image)?,
        image_corrupt: RequestCode::new(args.image_corrupt)?,
        gps: RequestCode::new(args.gps)?,
        ack: RequestCode::new(args.ack)?,
        nack: RequestCode::new(args.nack)?,
    })
}

fn run_options(repeat: &Repeat, cancel: &CancellationToken) -> RunOptions {
    let options = match (repeat.count, repeat.seconds) {
        (_, Some(seconds)) => RunOptions::for_duration(Duration::from_secs(seconds)),
        (Some(count), None) => RunOptions::count(count),
        (None, None) => RunOptions::default(),
    };
    options.cancel(cancel.clone())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Applications embedding the library should install their own subscriber.
    tracing_subscriber::fmt::init();

    let Cli {
        addr,
        mode,
        max_frame_length,
        codes,
        task,
    } = Cli::parse();
    let codes = request_codes(codes)?;
    let mut config = LinkConfig::default()
        .mode(mode)
        .max_frame_length(max_frame_length);
    if let Task::Arq {
        max_retransmissions: Some(limit),
        ..
    } = task
    {
        config = config.retry(RetryConfig::default().max_retransmissions(limit));
    }

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; stopping after the current item");
            signal.cancel();
        }
    });

    let mut session = Session::start(TcpDialer::new(addr), codes, config).await?;
    let mut sink = LogSink;

    let outcome: Result<(), RunError> = async {
        match task {
            Task::Echo(repeat) => {
                session.run_echo(&mut sink, &run_options(&repeat, &cancel)).await?;
            }
            Task::Arq { repeat, .. } => {
                session
                    .run_checked_echo(&mut sink, &run_options(&repeat, &cancel))
                    .await?;
            }
            Task::Image {
                repeat,
                corrupt,
                camera,
            } => {
                let camera = camera
                    .iter()
                    .filter_map(|directive| match directive.parse::<CameraCommand>() {
                        Ok(command) => Some(command),
                        Err(e) => {
                            error!("ignoring camera directive {directive:?}: {e}");
                            None
                        }
                    })
                    .collect::<Vec<_>>();
                session
                    .run_images(&mut sink, &run_options(&repeat, &cancel), corrupt, &camera)
                    .await?;
            }
            Task::Gps {
                route,
                trace,
                spacing,
            } => {
                let code = match route.as_deref() {
                    Some(route) => session.codes().gps_route(route).unwrap_or_else(|e| {
                        error!("ignoring route {route:?}: {e}");
                        session.codes().gps.clone()
                    }),
                    None => session.codes().gps.clone(),
                };
                let options = TraceOptions {
                    spacing: Duration::from_secs(spacing),
                    ..TraceOptions::default()
                };
                let points = session.run_gps(&mut sink, code, &options).await?;
                if trace {
                    session.run_gps_trace(&mut sink, &points).await?;
                }
            }
        }
        Ok(())
    }
    .await;

    session.close().await;
    if let Err(e) = &outcome {
        error!(
            "run failed after {} item(s): {}; abandoned item: {:?}",
            e.completed, e.fault, e.abandoned
        );
    }
    outcome.map_err(Into::into)
}
