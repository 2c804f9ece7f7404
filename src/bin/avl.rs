use std::{env, fmt, process::ExitCode};

use cordyceps_avl::{AvlMap, Order};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Keys from the command line. They are integers if the first argument parses as one.
#[derive(Debug, PartialEq, Eq)]
enum Keys {
    Ints(Vec<i32>),
    Strings(Vec<String>),
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Invalid integer '{arg}' found at index {index}.")]
struct InvalidInteger {
    arg: String,
    index: usize,
}

fn parse_keys(args: Vec<String>) -> Result<Keys, InvalidInteger> {
    if args.first().map_or(true, |first| first.parse::<i32>().is_err()) {
        return Ok(Keys::Strings(args));
    }

    let mut ints = Vec::with_capacity(args.len());

    for (index, arg) in args.into_iter().enumerate() {
        match arg.parse::<i32>() {
            Ok(value) => ints.push(value),
            Err(error) => {
                tracing::debug!(%arg, index, %error, "rejected key");
                return Err(InvalidInteger { arg, index });
            }
        }
    }

    Ok(Keys::Ints(ints))
}

fn report<K: Ord + fmt::Display + Clone>(keys: Vec<K>, dot: bool) -> Result<String, fmt::Error> {
    use fmt::Write;

    let map: AvlMap<K, K> = keys.into_iter().map(|k| (k.clone(), k)).collect();
    tracing::debug!(len = map.len(), height = map.height(), "built tree");

    let mut out = map.draw();
    let costs = map.search_costs();

    writeln!(out)?;
    writeln!(out, "Height:                   {}", map.height())?;
    writeln!(out, "Total nodes:              {}", map.len())?;
    writeln!(out, "Successful search cost:   {:.3}", costs.successful)?;
    writeln!(out, "Unsuccessful search cost: {:.3}", costs.unsuccessful)?;

    for order in [Order::PreOrder, Order::InOrder, Order::PostOrder] {
        map.write_traversal(order, &mut out)?;
        writeln!(out)?;
    }

    if dot {
        writeln!(out)?;
        map.dotgraph("avl", &mut out)?;
        writeln!(out)?;
    }

    Ok(out)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let dot = args.first().is_some_and(|arg| arg == "--dot");
    if dot {
        args.remove(0);
    }

    if args.is_empty() {
        eprintln!("Usage: avl [--dot] <key> [<key> ...]");
        return ExitCode::FAILURE;
    }

    let rendered = match parse_keys(args) {
        Ok(Keys::Ints(ints)) => report(ints, dot),
        Ok(Keys::Strings(strings)) => report(strings, dot),
        Err(error) => {
            eprintln!("Error: {error}");
            return ExitCode::FAILURE;
        }
    };

    match rendered {
        Ok(out) => {
            print!("{out}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!(%error, "failed to render report");
            ExitCode::FAILURE
        }
    }
}
