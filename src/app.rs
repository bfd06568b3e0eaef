//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler,
//! validates the config, and runs the requested transfer against the
//! directory-mirror store. Returns the process exit code.

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use zos_transfer::cli::{Args, Command, DownloadArgs, UploadArgs};
use zos_transfer::config::{config_path, create_template_config, load_config, validate_and_normalize};
use zos_transfer::output as out;
use zos_transfer::{
    Config, DownloadRequest, MirrorStore, TransferEngineError, TransferReport, UploadRequest,
    download_matching, shutdown, upload_directory,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub fn run(args: Args) -> Result<i32> {
    // Handle --print-config / --init-config before logging init
    if args.print_config {
        let path = config_path()?;
        out::print_info(&format!("zos_transfer config path:\n  {}\n", path.display()));
        if path.exists() {
            out::print_info("A config file exists at that location.");
        } else {
            out::print_info("No config file exists there yet. Run with --init-config to create a template.");
        }
        return Ok(0);
    }
    if args.init_config {
        let path = config_path()?;
        create_template_config(&path)?;
        out::print_success(&format!("A template zos_transfer config was written to: {}", path.display()));
        out::print_info("Edit the file to set `store_root` and optionally `log_level`, `log_file` and the default encodings.");
        return Ok(0);
    }

    let Some(command) = args.command.clone() else {
        out::print_error("No command given; use `upload-dir` or `download` (see --help).");
        return Ok(2);
    };

    // Build config: XML (if present) then CLI overrides.
    let mut cfg = match load_config()? {
        Some((_, cfg)) => cfg,
        None => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(&cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {}", e));
        e
    })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing in-flight transfers...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take(); // drop guard here to flush tracing_appender
            }
        })
        .expect("failed to install signal handler");
    }

    debug!("Starting zos_transfer: {:?}", args);

    let result = (|| -> Result<TransferReport> {
        validate_and_normalize(&mut cfg)?;
        match &command {
            Command::UploadDir(up) => run_upload(&cfg, up),
            Command::Download(down) => run_download(&cfg, down),
        }
    })();

    let code = match result {
        Ok(report) => {
            if args.report_json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("serialize report")?
                );
            } else {
                out::print_report(&report);
            }
            if shutdown::is_requested() && report.cancelled() > 0 {
                130
            } else {
                report.exit_code()
            }
        }
        Err(e) => {
            if let Some(te) = e.downcast_ref::<TransferEngineError>() {
                error!(code = te.code(), error = %te, "Transfer aborted");
            } else {
                error!(error = %format!("{e:#}"), "Transfer aborted");
            }
            out::print_error(&format!("{e:#}"));
            if shutdown::is_requested() { 130 } else { 1 }
        }
    };

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    Ok(code)
}

fn store_for(cfg: &Config) -> Result<MirrorStore> {
    let root = cfg
        .store_root
        .clone()
        .context("store_root is not configured")?;
    Ok(MirrorStore::new(root).with_preserve_mtime(cfg.preserve_mtime))
}

fn run_upload(cfg: &Config, up: &UploadArgs) -> Result<TransferReport> {
    let store = store_for(cfg)?;
    let target = store.uploader(&up.destination)?;

    let mut request = UploadRequest::new(&up.local_dir, up.destination.clone());
    request.attributes = up.attributes.clone();
    request.concurrency = cfg.concurrency();
    request.recursive = !up.no_recursive;
    request.include_hidden = cfg.include_hidden;
    request.max_depth = up.max_depth;
    request.replace = up.replace;
    request.fail_fast = cfg.fail_fast;
    request.binary = up.binary;
    request.files_map = up.files_map();

    let report = upload_directory(&request, &cfg.rule_loader(), &target, &target)?;
    Ok(report)
}

fn run_download(cfg: &Config, down: &DownloadArgs) -> Result<TransferReport> {
    let store = store_for(cfg)?;
    let target = store.downloader(&down.directory);

    let mut request = DownloadRequest::new(down.pattern.clone(), &down.directory);
    request.filters = down.filters.predicates();
    request.concurrency = cfg.concurrency();
    request.overwrite = down.overwrite;
    request.fail_fast = cfg.fail_fast;
    request.binary = down.binary;
    request.attributes = down.attributes.clone();
    request.naming = down.naming();

    let report = download_matching(&request, &cfg.rule_loader(), &store, &target)?;
    Ok(report)
}
