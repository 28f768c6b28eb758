use anyhow::{anyhow, bail, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};

use crate::app::context::AppContext;
use crate::app::services::{profile_service, transfer_service};
use crate::cli::SendArgs;
use crate::domain::transfer::{TransferEvent, TransferJob, TransferRequest, TransferStatus};
use crate::utils;

use super::profiles::ensure_password;

pub fn handle(ctx: &mut AppContext, args: SendArgs) -> Result<()> {
    let name = profile_service::resolve_profile_name(
        &ctx.profiles,
        args.profile.as_deref(),
        ctx.settings.last_profile.as_deref(),
    )
    .ok_or_else(|| match &args.profile {
        Some(requested) => anyhow!("Profile '{}' not found.", requested),
        None => anyhow!("No profiles saved. Use 'tarsend profile add' first."),
    })?;

    let mut profile = ctx
        .profiles
        .get_profile(&name)
        .cloned()
        .ok_or_else(|| anyhow!("Profile '{}' not found.", name))?;
    ensure_password(&mut profile)?;

    let paths = args
        .paths
        .iter()
        .map(|p| utils::normalize_path(&p.to_string_lossy()))
        .collect::<Result<Vec<_>>>()?;
    let remote_dir = args.remote_path.clone().unwrap_or_else(|| profile.remote_path.clone());
    let extract = args.should_extract(ctx.settings.extract_by_default);

    println!("Profile: {} ({}@{}:{})", name, profile.username, profile.host, profile.port);
    println!("{}", utils::selection_summary(&paths));
    println!("Destination: {}{}", remote_dir, if extract { " (extract)" } else { "" });

    let request = TransferRequest {
        profile,
        paths,
        remote_dir,
        extract,
    };
    request.validate()?;

    let handle = transfer_service::spawn_transfer(request, ctx.connect_timeout(), ctx.settings.temp_dir());

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")?
            .progress_chars("#>-"),
    );

    let mut job = TransferJob::new();
    for event in handle.events.iter() {
        job.apply(&event);
        let terminal = event.is_terminal();
        match event {
            TransferEvent::Message(msg) => pb.println(format!("[{}] {}", Local::now().format("%H:%M:%S"), msg)),
            TransferEvent::Progress { transferred, total } => {
                pb.set_length(total);
                pb.set_position(transferred);
            }
            TransferEvent::Finished => pb.finish_and_clear(),
            TransferEvent::Failed(_) => pb.abandon(),
        }
        if terminal {
            break;
        }
    }
    handle.join();

    match &job.status {
        TransferStatus::Completed => {
            println!(
                "Transfer completed successfully! ({} in {:.1}s)",
                utils::format_size(job.transferred),
                job.elapsed().as_secs_f64()
            );
            ctx.remember_profile(&name);
            Ok(())
        }
        TransferStatus::Failed(e) => {
            if let Some(percent) = job.upload_percent() {
                eprintln!("Upload reached {}% before the failure.", percent);
            }
            bail!("Transfer failed: {}", e)
        }
        // 通道关闭却没有终止事件，说明后台线程异常退出
        _ => bail!("Transfer worker stopped unexpectedly"),
    }
}
