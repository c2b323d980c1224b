//! File transfer through rsync or scp.
//!
//! Plain items are one rsync/scp call each. Pre-compressed items are packed
//! with tar on the sending side, moved as a single archive with scp, and
//! optionally unpacked on the receiving side:
//!
//! ```text
//! remote_to_local: ssh tar -czf  ->  scp host:archive local  ->  tar -xzf
//! local_to_remote: tar -czf      ->  scp archive host:dest   ->  ssh tar -xzf
//! ```
//!
//! Temporary archives are removed on a best-effort basis; a failed cleanup is
//! logged and never fails the transfer.

use std::path::Path;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use yawe_core::exec::{
    FileTransfer, ItemReport, TransferError, TransferItem, TransferReport, TransferRequest,
    shell_quote,
};
use yawe_types::config::TransferDefaults;
use yawe_types::workflow::{TransferDirection, TransferMethod};

use super::executor::{run_argv, ssh_prefix};

/// Bound on best-effort cleanup of temporary archives.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Default)]
pub struct RsyncTransfer {
    options: TransferDefaults,
}

impl RsyncTransfer {
    pub fn new(options: TransferDefaults) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransferDefaults {
        &self.options
    }

    async fn transfer_item(
        &self,
        request: &TransferRequest,
        item: &TransferItem,
    ) -> Result<ItemReport, TransferError> {
        let started = Instant::now();
        let (archive_name, archive_path) = if item.pre_compress {
            let archive_name = archive_name(source_path(request.direction, item), &timestamp());
            let archive_path = match request.direction {
                TransferDirection::RemoteToLocal => {
                    self.pull_compressed(request, item, &archive_name).await?
                }
                TransferDirection::LocalToRemote => {
                    self.push_compressed(request, item, &archive_name).await?
                }
            };
            (Some(archive_name), archive_path)
        } else {
            let argv = match item.method {
                TransferMethod::Rsync => rsync_argv(&request.host, request.direction, item, &self.options),
                TransferMethod::Scp => scp_argv(&request.host, request.direction, item, &self.options),
            };
            run_step(&argv, item, request.timeout).await?;
            (None, None)
        };

        Ok(ItemReport {
            remote_path: item.remote.clone(),
            local_path: item.local.clone(),
            method: item.method,
            compressed: item.pre_compress,
            archive_name,
            archive_path,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }

    /// Pack on the remote host, copy the archive down, optionally unpack.
    /// Returns where the archive remains, if it was kept.
    async fn pull_compressed(
        &self,
        request: &TransferRequest,
        item: &TransferItem,
        archive_name: &str,
    ) -> Result<Option<String>, TransferError> {
        let remote_archive = join_dir(&self.options.remote_temp_dir, archive_name);
        let local_archive = join_dir(&self.options.local_temp_dir, archive_name);

        tracing::info!(remote = %item.remote, archive = %remote_archive, "compressing on remote host");
        let mut pack = ssh_prefix(&request.host);
        pack.push(shell_join(&tar_create_argv(&remote_archive, &item.remote, &item.exclude)));

        let result = async {
            run_step(&pack, item, request.timeout).await?;
            let copy = vec![
                "scp".to_string(),
                remote_spec(&request.host, &remote_archive),
                local_archive.clone(),
            ];
            run_step(&copy, item, request.timeout).await
        }
        .await;
        cleanup_remote(&request.host, &remote_archive).await;
        result?;

        if !item.decompress {
            tracing::info!(archive = %local_archive, "keeping archive without unpacking");
            return Ok(Some(local_archive));
        }

        tokio::fs::create_dir_all(&item.local)
            .await
            .map_err(|e| TransferError::Io(format!("{}: {e}", item.local)))?;
        let unpack = vec![
            "tar".to_string(),
            "-xzf".to_string(),
            local_archive.clone(),
            "-C".to_string(),
            item.local.clone(),
        ];
        if let Err(e) = run_step(&unpack, item, request.timeout).await {
            tracing::warn!(archive = %local_archive, "unpack failed, archive left in place");
            return Err(e);
        }
        cleanup_local(&local_archive).await;
        Ok(None)
    }

    /// Pack locally, copy the archive up, optionally unpack on the host.
    async fn push_compressed(
        &self,
        request: &TransferRequest,
        item: &TransferItem,
        archive_name: &str,
    ) -> Result<Option<String>, TransferError> {
        let local_archive = join_dir(&self.options.local_temp_dir, archive_name);
        // Without unpacking the archive itself is the deliverable.
        let remote_archive = if item.decompress {
            join_dir(&self.options.remote_temp_dir, archive_name)
        } else {
            join_dir(&item.remote, archive_name)
        };

        tracing::info!(local = %item.local, archive = %local_archive, "compressing locally");
        let result = async {
            run_step(&tar_create_argv(&local_archive, &item.local, &item.exclude), item, request.timeout)
                .await?;
            let copy = vec![
                "scp".to_string(),
                local_archive.clone(),
                remote_spec(&request.host, &remote_archive),
            ];
            run_step(&copy, item, request.timeout).await
        }
        .await;
        cleanup_local(&local_archive).await;
        result?;

        if !item.decompress {
            tracing::info!(archive = %remote_archive, "keeping archive without unpacking");
            return Ok(Some(remote_archive));
        }

        let mut unpack = ssh_prefix(&request.host);
        unpack.push(format!(
            "mkdir -p {dest} && tar -xzf {archive} -C {dest}",
            dest = shell_quote(&item.remote),
            archive = shell_quote(&remote_archive),
        ));
        if let Err(e) = run_step(&unpack, item, request.timeout).await {
            tracing::warn!(archive = %remote_archive, "remote unpack failed, archive left in place");
            return Err(e);
        }
        cleanup_remote(&request.host, &remote_archive).await;
        Ok(None)
    }
}

impl FileTransfer for RsyncTransfer {
    fn transfer<'a>(
        &'a self,
        request: &'a TransferRequest,
    ) -> BoxFuture<'a, Result<TransferReport, TransferError>> {
        async move {
            let started = Instant::now();
            let mut items = Vec::with_capacity(request.items.len());
            for (idx, item) in request.items.iter().enumerate() {
                tracing::info!(
                    item = idx + 1,
                    of = request.items.len(),
                    direction = %request.direction,
                    method = %item.method,
                    pre_compress = item.pre_compress,
                    remote = %item.remote,
                    local = %item.local,
                    "transferring"
                );
                items.push(self.transfer_item(request, item).await?);
            }
            Ok(TransferReport {
                items,
                total_time_secs: started.elapsed().as_secs_f64(),
            })
        }
        .boxed()
    }
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

/// `host:path` as understood by rsync and scp.
pub fn remote_spec(host: &str, path: &str) -> String {
    format!("{host}:{path}")
}

fn endpoints(host: &str, direction: TransferDirection, item: &TransferItem) -> [String; 2] {
    match direction {
        TransferDirection::RemoteToLocal => [remote_spec(host, &item.remote), item.local.clone()],
        TransferDirection::LocalToRemote => [item.local.clone(), remote_spec(host, &item.remote)],
    }
}

pub fn rsync_argv(
    host: &str,
    direction: TransferDirection,
    item: &TransferItem,
    options: &TransferDefaults,
) -> Vec<String> {
    let mut argv = vec!["rsync".to_string(), "-v".to_string()];
    if item.recursive {
        argv.push("-r".to_string());
    }
    if options.preserve_times {
        argv.push("-t".to_string());
    }
    if options.compress {
        argv.push("-z".to_string());
    }
    if options.show_progress {
        argv.push("--progress".to_string());
    }
    for pattern in &item.exclude {
        argv.push("--exclude".to_string());
        argv.push(pattern.clone());
    }
    argv.extend(endpoints(host, direction, item));
    argv
}

/// scp has no exclude support; patterns are ignored for scp items.
pub fn scp_argv(
    host: &str,
    direction: TransferDirection,
    item: &TransferItem,
    options: &TransferDefaults,
) -> Vec<String> {
    let mut argv = vec!["scp".to_string()];
    if item.recursive {
        argv.push("-r".to_string());
    }
    if options.preserve_times {
        argv.push("-p".to_string());
    }
    if options.compress {
        argv.push("-C".to_string());
    }
    argv.extend(endpoints(host, direction, item));
    argv
}

/// `tar -czf <archive> [--exclude p]... -C <parent> <name>`.
pub fn tar_create_argv(archive: &str, source: &str, exclude: &[String]) -> Vec<String> {
    let mut argv = vec!["tar".to_string(), "-czf".to_string(), archive.to_string()];
    for pattern in exclude {
        argv.push("--exclude".to_string());
        argv.push(pattern.clone());
    }
    let trimmed = source.trim_end_matches('/');
    let path = Path::new(trimmed);
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            argv.push("-C".to_string());
            argv.push(parent.to_string_lossy().into_owned());
            argv.push(name.to_string_lossy().into_owned());
        }
        _ => argv.push(source.to_string()),
    }
    argv
}

/// `{basename}_transfer_{stamp}.tar.gz`, with `transfer` for a nameless source.
pub fn archive_name(source: &str, stamp: &str) -> String {
    let base = Path::new(source.trim_end_matches('/'))
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "transfer".to_string());
    format!("{base}_transfer_{stamp}.tar.gz")
}

fn source_path(direction: TransferDirection, item: &TransferItem) -> &str {
    match direction {
        TransferDirection::RemoteToLocal => &item.remote,
        TransferDirection::LocalToRemote => &item.local,
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn join_dir(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}

fn shell_join(argv: &[String]) -> String {
    argv.iter()
        .map(|a| shell_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Step execution
// ---------------------------------------------------------------------------

async fn run_step(argv: &[String], item: &TransferItem, timeout: Duration) -> Result<(), TransferError> {
    tracing::debug!(command = %argv.join(" "), "transfer step");
    let output = run_argv(argv, timeout)
        .await
        .map_err(|e| TransferError::Failed {
            item: item.remote.clone(),
            message: e.to_string(),
        })?;

    if output.timed_out {
        return Err(TransferError::Timeout {
            item: item.remote.clone(),
            secs: timeout.as_secs(),
        });
    }
    for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
        tracing::debug!(program = %argv[0], "{line}");
    }
    match output.exit_code {
        Some(0) => Ok(()),
        code => Err(TransferError::Failed {
            item: item.remote.clone(),
            message: format!(
                "{} exited with {}: {}",
                argv[0],
                code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                output.stderr.trim()
            ),
        }),
    }
}

async fn cleanup_remote(host: &str, path: &str) {
    let mut argv = ssh_prefix(host);
    argv.push(format!("rm -f {}", shell_quote(path)));
    match run_argv(&argv, CLEANUP_TIMEOUT).await {
        Ok(out) if out.exit_code == Some(0) => {}
        Ok(out) => tracing::warn!(host, path, stderr = %out.stderr.trim(), "failed to remove remote archive"),
        Err(e) => tracing::warn!(host, path, error = %e, "failed to remove remote archive"),
    }
}

async fn cleanup_local(path: &str) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path, error = %e, "failed to remove local archive");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn item(remote: &str, local: &str) -> TransferItem {
        TransferItem {
            remote: remote.to_string(),
            local: local.to_string(),
            recursive: true,
            exclude: vec!["*.tmp".to_string()],
            method: TransferMethod::Rsync,
            pre_compress: false,
            decompress: false,
        }
    }

    #[test]
    fn rsync_pull_arguments() {
        let argv = rsync_argv(
            "gpu01",
            TransferDirection::RemoteToLocal,
            &item("/data/out/", "./out"),
            &TransferDefaults::default(),
        );
        assert_eq!(
            argv,
            vec!["rsync", "-v", "-r", "-t", "-z", "--exclude", "*.tmp", "gpu01:/data/out/", "./out"]
        );
    }

    #[test]
    fn rsync_push_honours_options() {
        let options = TransferDefaults {
            compress: false,
            preserve_times: false,
            show_progress: true,
            ..TransferDefaults::default()
        };
        let mut it = item("/srv/in", "./in");
        it.recursive = false;
        it.exclude.clear();
        let argv = rsync_argv("h", TransferDirection::LocalToRemote, &it, &options);
        assert_eq!(argv, vec!["rsync", "-v", "--progress", "./in", "h:/srv/in"]);
    }

    #[test]
    fn scp_arguments_skip_excludes() {
        let argv = scp_argv(
            "h",
            TransferDirection::RemoteToLocal,
            &item("/a", "/b"),
            &TransferDefaults::default(),
        );
        assert_eq!(argv, vec!["scp", "-r", "-p", "-C", "h:/a", "/b"]);
    }

    #[test]
    fn tar_changes_into_parent() {
        assert_eq!(
            tar_create_argv("/tmp/x.tar.gz", "/data/results/", &["*.log".to_string()]),
            vec!["tar", "-czf", "/tmp/x.tar.gz", "--exclude", "*.log", "-C", "/data", "results"]
        );
        assert_eq!(
            tar_create_argv("/tmp/x.tar.gz", "results", &[]),
            vec!["tar", "-czf", "/tmp/x.tar.gz", "results"]
        );
    }

    #[test]
    fn archive_names() {
        assert_eq!(
            archive_name("/data/results/", "20260101_120000"),
            "results_transfer_20260101_120000.tar.gz"
        );
        assert_eq!(archive_name("/", "s"), "transfer_transfer_s.tar.gz");
    }

    #[test]
    fn remote_tar_command_is_quoted() {
        let cmd = shell_join(&tar_create_argv("/tmp/a b.tar.gz", "/x/y", &[]));
        assert_eq!(cmd, "'tar' '-czf' '/tmp/a b.tar.gz' '-C' '/x' 'y'");
    }

    #[test]
    fn join_dir_strips_trailing_slash() {
        assert_eq!(join_dir("/tmp/", "a.tar.gz"), "/tmp/a.tar.gz");
    }

    #[tokio::test]
    async fn failing_step_carries_stderr() {
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "echo nope >&2; exit 23".to_string()];
        let err = run_step(&argv, &item("/r", "/l"), Duration::from_secs(5)).await.unwrap_err();
        match err {
            TransferError::Failed { item, message } => {
                assert_eq!(item, "/r");
                assert!(message.contains("exited with 23"));
                assert!(message.contains("nope"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_step_times_out() {
        let argv = vec!["/bin/sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
        let err = run_step(&argv, &item("/r", "/l"), Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, TransferError::Timeout { .. }));
    }
}
