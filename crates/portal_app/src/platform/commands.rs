use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use portal_core::{
    count_by_source, DashboardStats, Registration, ResourceDownload, ResourceFilters,
    SubmissionForm, Target, UploadFile, UploadVerdict, UserContentStats,
};
use portal_engine::{
    ensure_state_dir, AtomicFileWriter, FileTokenStore, PortalConfig, PortalContext,
};
use portal_logging::{portal_info, portal_warn};
use tokio_util::sync::CancellationToken;

use crate::cli::{Command, RepositoryLogin, UploadArgs};
use crate::platform::proxy;

const BAR_WIDTH: u64 = 40;

pub async fn run(command: Command, config: PortalConfig) -> Result<()> {
    if let Command::Proxy = command {
        return run_proxy(&config).await;
    }

    ensure_state_dir(&config.state_dir)
        .with_context(|| format!("state directory {:?}", config.state_dir))?;
    let store = Arc::new(FileTokenStore::new(config.state_dir.clone()));
    let context = PortalContext::new(config, store).context("building portal services")?;

    let result = match command {
        Command::Proxy => Ok(()),
        Command::Login { email, password } => login(&context, &email, &password).await,
        Command::Logout => logout(&context).await,
        Command::Whoami => whoami(&context).await,
        Command::Search { query, limit } => search(&context, &query, limit).await,
        Command::Upload(args) => upload(&context, args).await,
        Command::Dashboard {
            scope,
            user,
            repository,
        } => dashboard(&context, scope.as_deref(), user.as_deref(), &repository).await,
        Command::Files { query } => files(&context, query.as_deref()).await,
        Command::Register {
            username,
            email,
            first_name,
            last_name,
            password,
        } => {
            let registration = Registration {
                username,
                email,
                first_name,
                last_name,
                confirm_password: password.clone(),
                password,
            };
            register(&context, &registration).await
        }
        Command::Resources {
            query,
            source,
            resource_type,
            year,
            limit,
        } => {
            let filters = ResourceFilters {
                source,
                resource_type,
                year,
            };
            resources(&context, &query, &filters, limit).await
        }
        Command::Resource { id } => resource(&context, id).await,
        Command::Download { id, out } => download(&context, id, out).await,
        Command::Analytics { days } => analytics(&context, days).await,
    };
    context.shutdown();
    result
}

async fn run_proxy(config: &PortalConfig) -> Result<()> {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            portal_info!("Interrupt received, stopping proxy");
        }
        trigger.cancel();
    });
    println!(
        "Proxying {}{} -> {}",
        config.proxy.listen, config.proxy.prefix, config.proxy.target
    );
    proxy::serve(&config.proxy, &config.http.settings(), shutdown).await?;
    Ok(())
}

async fn login(context: &PortalContext, email: &str, password: &str) -> Result<()> {
    let session = context.auth().login(email, password).await?;
    println!("Signed in as {} ({})", session.display_name, session.role);
    Ok(())
}

async fn logout(context: &PortalContext) -> Result<()> {
    if context.auth().restore().await.is_none() {
        portal_info!("No valid stored session; clearing local state only");
    }
    context.auth().logout().await;
    println!("Signed out.");
    Ok(())
}

async fn whoami(context: &PortalContext) -> Result<()> {
    context.auth().restore().await;
    let view = context.auth().view();
    let admin = view.can_open_admin_dashboard();
    match (view.is_signed_in(), view.display_name, view.role) {
        (true, Some(name), Some(role)) => {
            println!("{name} ({role})");
            if admin {
                println!("Dashboard access: yes");
            }
        }
        _ => println!("Not signed in."),
    }
    Ok(())
}

async fn search(context: &PortalContext, query: &str, limit: u32) -> Result<()> {
    let records = context.catalog().search(query, limit).await;
    if records.is_empty() {
        println!("No catalog records found.");
        return Ok(());
    }
    for record in records {
        let author = record.author.as_deref().unwrap_or("unknown author");
        let year = record.year.as_deref().unwrap_or("n.d.");
        println!("[{}] {} / {} ({})", record.id, record.title, author, year);
        println!("    {}", record.url);
    }
    Ok(())
}

async fn upload(context: &PortalContext, args: UploadArgs) -> Result<()> {
    let targets: BTreeSet<Target> = args.targets.iter().copied().map(Target::from).collect();
    let files = args
        .files
        .iter()
        .map(|path| read_upload(path))
        .collect::<Result<Vec<_>>>()?;
    let form = SubmissionForm {
        title: args.title,
        authors: args.authors,
        description: args.description,
        collection_id: args.collection,
        extra_fields: args.fields.into_iter().collect(),
    };

    if targets.contains(&Target::Local) && context.auth().restore().await.is_none() {
        portal_warn!("Uploading to the local backend without a session");
    }
    if targets.contains(&Target::Repository) {
        sign_in_repository(context, &args.repository).await?;
    }

    let outcome = context.uploads().submit(form, files, targets).await?;
    println!("{}", outcome.summary());
    for error in &outcome.errors {
        println!("  - {error}");
    }
    if let Some(item) = &outcome.repository_item {
        println!(
            "Workspace item {} in collection {} ({} file(s))",
            item.id,
            item.collection_id,
            item.attached_files.len()
        );
    }
    if context.repository().is_authenticated() {
        context.repository().logout().await;
    }
    if outcome.verdict() == UploadVerdict::Failed {
        bail!("upload failed");
    }
    Ok(())
}

async fn dashboard(
    context: &PortalContext,
    scope: Option<&str>,
    user: Option<&str>,
    repository: &RepositoryLogin,
) -> Result<()> {
    if repository.repository_email.is_some() {
        sign_in_repository(context, repository).await?;
    }
    let stats = context.dashboard().load_stats(scope).await;
    print_stats(&stats);

    if let Some(user_id) = user {
        match context.dashboard().load_user_stats(user_id).await {
            Some(user_stats) => print_user_stats(&user_stats),
            None => println!("No submission statistics for {user_id}."),
        }
    }
    if context.repository().is_authenticated() {
        context.repository().logout().await;
    }
    Ok(())
}

async fn files(context: &PortalContext, query: Option<&str>) -> Result<()> {
    context.auth().restore().await;
    let files = match query {
        Some(query) => context.local().search_files(query).await?,
        None => context.local().list_files().await?,
    };
    if files.is_empty() {
        println!("No files.");
    }
    for file in files {
        let link = file.file_url.as_deref().unwrap_or("-");
        println!("[{}] {} {}", file.id, file.title, link);
        if !file.repository_id.is_empty() {
            println!("    repository item {}", file.repository_id);
        }
    }
    Ok(())
}

async fn register(context: &PortalContext, registration: &Registration) -> Result<()> {
    context.auth().register(registration).await?;
    println!(
        "Account {} created. Sign in with `portal login {}`.",
        registration.username, registration.email
    );
    Ok(())
}

async fn resources(
    context: &PortalContext,
    query: &str,
    filters: &ResourceFilters,
    limit: u32,
) -> Result<()> {
    context.auth().restore().await;
    let records = context
        .local()
        .search_resources(query, filters, limit)
        .await?;
    if records.is_empty() {
        println!("No resources found.");
        return Ok(());
    }
    for record in &records {
        let by = record.authors.as_deref().unwrap_or("unknown author");
        let year = record.year.as_deref().unwrap_or("n.d.");
        println!("[{}] {} / {} ({})", record.source, record.title, by, year);
        if let Some(link) = &record.link {
            println!("    {link}");
        }
    }
    let counts = count_by_source(&records)
        .into_iter()
        .map(|(source, count)| format!("{source} {count}"))
        .collect::<Vec<_>>();
    println!("{} result(s): {}", records.len(), counts.join(", "));
    Ok(())
}

async fn resource(context: &PortalContext, id: u64) -> Result<()> {
    context.auth().restore().await;
    let detail = context.local().resource(id).await?;
    println!("{} [{}]", detail.title, detail.source);
    if !detail.authors.is_empty() {
        println!("  Authors:   {}", detail.authors);
    }
    if let Some(year) = detail.year {
        println!("  Year:      {year}");
    }
    if !detail.resource_type.is_empty() {
        println!("  Type:      {}", detail.resource_type);
    }
    if !detail.description.is_empty() {
        println!("  {}", detail.description);
    }
    println!(
        "  Views {}, downloads {}",
        detail.view_count, detail.download_count
    );
    Ok(())
}

async fn download(context: &PortalContext, id: u64, out: PathBuf) -> Result<()> {
    context.auth().restore().await;
    match context.local().download(id).await? {
        ResourceDownload::File {
            file_name, bytes, ..
        } => {
            let path = AtomicFileWriter::new(out)
                .write_bytes(&file_name, &bytes)
                .with_context(|| format!("saving {file_name}"))?;
            println!("Saved {} ({} bytes)", path.display(), bytes.len());
        }
        ResourceDownload::External { url } => {
            println!("Held in another system: {url}");
        }
    }
    Ok(())
}

async fn analytics(context: &PortalContext, days: u32) -> Result<()> {
    if context.auth().restore().await.is_none() {
        bail!("sign in with an admin account first");
    }
    let report = context.local().analytics(days).await?;
    println!(
        "Last {} day(s): {} resources, {} downloads, {} searches",
        days, report.total_resources, report.total_downloads, report.total_searches
    );
    if !report.top_searches.is_empty() {
        println!("Top searches:");
        for search in &report.top_searches {
            println!("  {:<30} {:>6}", search.query, search.count);
        }
    }
    if !report.popular_resources.is_empty() {
        println!("Most downloaded:");
        for popular in &report.popular_resources {
            println!("  {:<30} {:>6}", popular.title, popular.download_count);
        }
    }
    for share in &report.source_distribution {
        println!("  {:<12} {:>6}", share.source, share.count);
    }
    Ok(())
}

async fn sign_in_repository(context: &PortalContext, login: &RepositoryLogin) -> Result<()> {
    let (Some(email), Some(password)) = (&login.repository_email, &login.repository_password)
    else {
        bail!("repository credentials required (--repository-email and PORTAL_REPOSITORY_PASSWORD)");
    };
    context.repository().login(email, password).await?;
    Ok(())
}

fn read_upload(path: &Path) -> Result<UploadFile> {
    let bytes = fs::read(path).with_context(|| format!("reading {path:?}"))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".to_string());
    let file = UploadFile::new(name, bytes);
    Ok(match content_type_for(path) {
        Some(content_type) => file.with_content_type(content_type),
        None => file,
    })
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "tif" | "tiff" => Some("image/tiff"),
        "txt" => Some("text/plain"),
        _ => None,
    }
}

fn print_stats(stats: &DashboardStats) {
    println!("Collections:    {}", stats.collections);
    println!("Archived items: {}", stats.archived_items);
    println!("In workflow:    {}", stats.workflow_items);
    let max = stats.max_collection_total().max(1);
    for collection in &stats.per_collection {
        let total = collection.archived_count + collection.workflow_count;
        let bar = "#".repeat((total * BAR_WIDTH / max) as usize);
        println!(
            "  {:<30} {:>6} archived {:>6} workflow {}",
            collection.label, collection.archived_count, collection.workflow_count, bar
        );
    }
}

fn print_user_stats(stats: &UserContentStats) {
    if !stats.has_submissions() {
        println!("No submissions yet.");
    }
    let mine = &stats.my_submission;
    println!(
        "Workspace {} (rejected {}), workflow {}, archived {}, withdrawn {}",
        mine.workspace.total,
        mine.workspace.rejected,
        mine.workflow.total,
        mine.archived,
        mine.withdrawn
    );
    for step in stats.action_entries() {
        println!("  {}", UserContentStats::step_label(&step.step));
        for entry in step.details {
            println!("    {:<12} {}", entry.action, entry.count);
        }
    }
}
