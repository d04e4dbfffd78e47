//! Documentation toolchain installation on CI workers.
//!
//! Installs Node.js from the NodeSource apt repository, the `less` CSS
//! compiler with its clean-css plugin, and a pinned Doxygen package.

use tracing::info;

use crate::context::RunContext;
use crate::error::Result;
use crate::fetch::download_to;

pub const NODESOURCE_KEY_URL: &str = "https://deb.nodesource.com/gpgkey/nodesource.gpg.key";
pub const NODESOURCE_LIST_PATH: &str = "/etc/apt/sources.list.d/nodesource.list";
pub const NODESOURCE_LIST_ENTRY: &str = "deb https://deb.nodesource.com/node_0.10 precise main";

pub const APT_PACKAGES: [&str; 2] = ["python-virtualenv", "nodejs"];
pub const NPM_PACKAGES: [&str; 2] = ["less", "less-plugin-clean-css"];

pub const DOXYGEN_DEB: &str = "doxygen_1.8.6-2_amd64.deb";
pub const DOXYGEN_MIRROR: &str = "http://mirrors.kernel.org/ubuntu/pool/main/d/doxygen/";

/// Full download URL of the pinned Doxygen package.
pub fn doxygen_url() -> String {
    format!("{DOXYGEN_MIRROR}{DOXYGEN_DEB}")
}

/// Install every tool the documentation build needs.
pub async fn install(ctx: &RunContext) -> Result<()> {
    info!("Installing documentation toolchain");

    let key = ctx.fetcher.fetch(NODESOURCE_KEY_URL).await?;
    ctx.run(ctx.command("apt_key", "sudo").args(["apt-key", "add", "-"]).stdin(key))
        .await?;

    ctx.run(
        ctx.command("apt_source", "sudo")
            .args(["tee", NODESOURCE_LIST_PATH])
            .stdin(format!("{NODESOURCE_LIST_ENTRY}\n")),
    )
    .await?;

    ctx.run(ctx.command("apt_update", "sudo").args(["apt-get", "update"]))
        .await?;
    ctx.run(
        ctx.command("apt_install", "sudo")
            .args(["apt-get", "install"])
            .args(APT_PACKAGES),
    )
    .await?;

    ctx.run(
        ctx.command("npm_install", "npm")
            .args(["install", "-g"])
            .args(NPM_PACKAGES),
    )
    .await?;

    let deb_path = ctx.layout.source_root.join(DOXYGEN_DEB);
    download_to(ctx.fetcher.as_ref(), &doxygen_url(), &deb_path).await?;
    ctx.run(
        ctx.command("dpkg_install", "sudo")
            .args(["dpkg", "-i"])
            .arg(deb_path.to_string_lossy()),
    )
    .await?;

    Ok(())
}
