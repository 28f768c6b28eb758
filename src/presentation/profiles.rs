use anyhow::{anyhow, bail, Result};
use inquire::{Password, PasswordDisplayMode};

use crate::app::context::AppContext;
use crate::app::services::profile_service;
use crate::cli::{AddProfileArgs, ProfileCommand};
use crate::domain::profile::{Auth, AuthMethod, Profile, ValidationError};

pub fn handle(ctx: &mut AppContext, command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::List => list(ctx),
        ProfileCommand::Show { name } => show(ctx, &name),
        ProfileCommand::Add(args) => add(ctx, args),
        ProfileCommand::Remove { name } => {
            if !ctx.profiles.delete_profile(&name) {
                bail!("Profile '{}' not found.", name);
            }
            println!("Profile '{}' removed.", name);
            Ok(())
        }
        ProfileCommand::Test { name } => test(ctx, &name),
        ProfileCommand::Export { file } => {
            if !ctx.profiles.export_profiles(&file) {
                bail!("Failed to export profiles to {:?}", file);
            }
            println!("Exported profiles to {:?}.", file);
            println!("Note: passwords are stored in plain text in the exported file.");
            Ok(())
        }
        ProfileCommand::Import { file } => {
            if !ctx.profiles.import_profiles(&file) {
                bail!("Failed to import profiles from {:?}", file);
            }
            println!("Imported profiles from {:?}.", file);
            Ok(())
        }
    }
}

fn list(ctx: &AppContext) -> Result<()> {
    if ctx.profiles.is_empty() {
        println!("No profiles saved. Use 'tarsend profile add <name> --host <host> -u <user>' to add one.");
        return Ok(());
    }
    println!("Saved profiles ({}):", ctx.profiles.path().display());
    for name in ctx.profiles.profile_names() {
        if let Some(p) = ctx.profiles.get_profile(&name) {
            println!(
                "  {} -> {}@{}:{} [{}] {}",
                name,
                p.username,
                p.host,
                p.port,
                p.auth.method(),
                p.remote_path
            );
        }
    }
    Ok(())
}

fn show(ctx: &AppContext, name: &str) -> Result<()> {
    let profile = ctx
        .profiles
        .get_profile(name)
        .ok_or_else(|| anyhow!("Profile '{}' not found.", name))?;
    println!("{}", serde_json::to_string_pretty(&profile.redacted())?);
    if ctx.profiles.has_unreadable_secret(name) {
        println!("Warning: the stored password could not be decrypted on this machine/user; re-enter it with 'profile add'.");
    }
    Ok(())
}

fn add(ctx: &mut AppContext, args: AddProfileArgs) -> Result<()> {
    if args.name.trim().is_empty() {
        bail!("Please enter a profile name.");
    }

    let profile = match args.auth_method {
        AuthMethod::Password => {
            let password = match args.password {
                Some(p) => p,
                None => Password::new(&format!("Password for {}@{}:", args.user, args.host))
                    .with_display_mode(PasswordDisplayMode::Masked)
                    .without_confirmation()
                    .prompt()?,
            };
            Profile::with_password(&args.host, args.port, &args.user, &password, &args.remote_path)
        }
        AuthMethod::Key => {
            let key_file = args.key_file.unwrap_or_default();
            Profile::with_key_file(&args.host, args.port, &args.user, key_file, &args.remote_path)
        }
    };

    match profile.validate() {
        Ok(()) => {}
        Err(e @ (ValidationError::MissingHost | ValidationError::MissingUsername | ValidationError::InvalidPort)) => {
            bail!(e)
        }
        Err(e) => eprintln!("Warning: {}", e),
    }

    let name = args.name.trim();
    if !ctx.profiles.save_profile(name, profile) {
        bail!("Profile '{}' could not be written to {:?}", name, ctx.profiles.path());
    }
    println!("Profile '{}' saved.", name);
    Ok(())
}

fn test(ctx: &AppContext, name: &str) -> Result<()> {
    let mut profile = ctx
        .profiles
        .get_profile(name)
        .cloned()
        .ok_or_else(|| anyhow!("Profile '{}' not found.", name))?;
    ensure_password(&mut profile)?;

    println!("Testing connection to {}@{}:{}...", profile.username, profile.host, profile.port);
    let (ok, message) = profile_service::test_connection(&profile, ctx.connect_timeout());
    if !ok {
        bail!(message);
    }
    println!("{}", message);
    Ok(())
}

/// 密码为空 (未保存或无法解密) 时交互式询问
pub fn ensure_password(profile: &mut Profile) -> Result<()> {
    let prompt = format!("Password for {}@{}:", profile.username, profile.host);
    if let Auth::Password { password } = &mut profile.auth {
        if password.is_empty() {
            *password = Password::new(&prompt)
                .with_display_mode(PasswordDisplayMode::Masked)
                .without_confirmation()
                .prompt()?;
        }
    }
    Ok(())
}
