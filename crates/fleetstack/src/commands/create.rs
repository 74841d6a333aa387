use super::Outcome;
use anyhow::Context;
use clap::Args;
use colored::Colorize;
use fleetstack_cloud::{Orchestrator, ProvisionOutcome, ProvisionSettings, parse_parameter, plan};
use fleetstack_cloud_aws::{CloudFormationService, Ec2Lookup, load_config};
use fleetstack_core::{
    Architecture, Count, Exposure, FleetError, HostRecord, ImageCatalog,
    ImageOverrides, NetworkMode, OsTagStyle, RhelVersion, Topology, TopologyRequest,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// スタック完了待ちの猶予（CloudFormation のタイムアウトに上乗せ）
const STACK_DEADLINE_GRACE: Duration = Duration::from_secs(15 * 60);

/// ホスト名解決の待ち上限
const HOSTNAME_DEADLINE: Duration = Duration::from_secs(30 * 60);

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// スタックの共通名
    #[arg(long, default_value = "rhui")]
    pub name: String,

    /// リージョン
    #[arg(short, long, default_value = "eu-west-1")]
    pub region: String,

    /// CDS の台数
    #[arg(long, default_value_t = 1)]
    pub cds: u32,

    /// HAProxy の台数
    #[arg(long, default_value_t = 1)]
    pub haproxy: u32,

    /// 名前解決ノードを追加
    #[arg(long)]
    pub dns: bool,

    /// 専用の NFS ノードを追加
    #[arg(long)]
    pub nfs: bool,

    /// RHEL8 のテストノードを追加
    #[arg(long)]
    pub test: bool,

    /// クライアント台数 (VERSION=COUNT、COUNT に all でアーキテクチャごとに1台)
    #[arg(long = "cli", value_name = "VERSION=COUNT")]
    pub clients: Vec<String>,

    /// クライアントのアーキテクチャ (VERSION=ARCH[,ARCH...])
    #[arg(long = "cli-arch", value_name = "VERSION=ARCHS")]
    pub client_archs: Vec<String>,

    /// RHEL6〜9 のクライアントをアーキテクチャごとに起動（台数指定は優先）
    #[arg(long)]
    pub cli_all: bool,

    /// クライアントのみ起動
    #[arg(long)]
    pub cli_only: bool,

    /// マッピングを上書きする AMI (VERSION=ID または VERSION:ARCH=ID)
    #[arg(long = "ami-override", value_name = "VERSION[:ARCH]=ID")]
    pub ami_overrides: Vec<String>,

    /// ロール単位で固定する AMI (STEM=ID、例: cds=ami-0123)
    #[arg(long = "role-ami", value_name = "STEM=ID")]
    pub role_amis: Vec<String>,

    /// VPC ID（設定ファイルより優先）
    #[arg(long)]
    pub vpc_id: Option<String>,

    /// サブネット ID（設定ファイルより優先）
    #[arg(long)]
    pub subnet_id: Option<String>,

    /// VPC を使わずフラットネットワークで起動
    #[arg(long, conflicts_with_all = ["vpc_id", "subnet_id"])]
    pub no_vpc: bool,

    /// イメージインデックス (RHEL<v>mapping*.json) のディレクトリ
    #[arg(long)]
    pub image_dir: Option<PathBuf>,

    /// inventory の出力先
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// テンプレートパラメータ (NAME=VALUE)
    #[arg(long, num_args = 1..)]
    pub parameters: Vec<String>,

    /// スタック作成のタイムアウト（分）
    #[arg(long, default_value_t = 10)]
    pub timeout: u32,

    /// テンプレートを生成・検証して表示するだけ
    #[arg(long)]
    pub dry_run: bool,

    /// キーペア名（設定ファイルにリージョンの ssh 設定がない場合）
    #[arg(long)]
    pub key_pair_name: Option<String>,

    /// Ansible の SSH 接続に渡す追加引数
    #[arg(long, value_name = "ARGS")]
    pub ansible_ssh_extra_args: Option<String>,

    /// OSタグを切り詰めずに付与（RHEL10 など）
    #[arg(long)]
    pub full_os_tags: bool,

    /// 設定ファイル
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// 作成結果の表示用
#[derive(Debug, Serialize)]
struct CreatedInstance {
    role: String,
    hostname: String,
    ip: Option<String>,
    instance_id: String,
    exposure: Exposure,
}

impl From<&HostRecord> for CreatedInstance {
    fn from(host: &HostRecord) -> Self {
        let address = host.connect_address();
        Self {
            role: host.role.map(|r| r.tag().to_string()).unwrap_or_default(),
            hostname: address.hostname,
            ip: address.ip,
            instance_id: host.instance_id.clone(),
            exposure: address.exposure,
        }
    }
}

pub async fn handle(args: CreateArgs) -> anyhow::Result<Outcome> {
    let config = fleetstack_config::load(args.config.as_deref())?;

    let network = resolve_network(&args, &config)?;
    let topology = build_topology(&args, network)?;
    topology.validate()?;

    let settings = build_settings(&args, &config)?;
    let image_dir = args
        .image_dir
        .clone()
        .or_else(|| config.image_dir.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let overrides = parse_ami_overrides(&args.ami_overrides)?;
    let catalog = ImageCatalog::load(&image_dir, &topology, &overrides)
        .with_context(|| format!("イメージディレクトリ: {}", image_dir.display()))?;

    println!("{}", topology.description().cyan());

    if args.dry_run {
        let plan = plan(&topology, &catalog, &settings)?;
        println!("{}", plan.template_body);
        println!();
        println!(
            "{}",
            format!(
                "✓ テンプレートを検証しました（{} リソース）",
                plan.graph.nodes.len()
            )
            .green()
            .bold()
        );
        return Ok(Outcome::Success);
    }

    println!(
        "{}",
        format!("スタックを作成中... (リージョン: {})", settings.region).blue()
    );

    let sdk_config = load_config(&settings.region).await;
    let service = CloudFormationService::new(&sdk_config);
    let compute = Ec2Lookup::new(&sdk_config);
    let orchestrator = Orchestrator::new(&service, &compute, &settings);

    let outcome = orchestrator
        .provision(&topology, &catalog, args.output.clone())
        .await?;

    match outcome {
        ProvisionOutcome::StackFailed { run } => {
            eprintln!();
            eprintln!(
                "{}",
                format!(
                    "✗ スタック {} の作成に失敗しました: {}",
                    run.name,
                    run.last_status.as_deref().unwrap_or("UNKNOWN")
                )
                .red()
                .bold()
            );
            eprintln!("スタックは調査のため残しています。");
            Ok(Outcome::StackFailed)
        }
        ProvisionOutcome::Completed {
            run,
            hosts,
            inventory,
        } => {
            println!(
                "{}",
                format!("✓ スタック {} を作成しました", run.name)
                    .green()
                    .bold()
            );
            println!();

            let created: Vec<CreatedInstance> = hosts.iter().map(CreatedInstance::from).collect();
            print!("{}", serde_yaml::to_string(&created)?);

            let ids: Vec<&str> = hosts.iter().map(|h| h.instance_id.as_str()).collect();
            println!("Instance IDs: {}", ids.join(" "));
            println!("Inventory: {}", inventory.path.display());

            if !inventory.validation.is_ok() {
                super::validate::report(&inventory.validation);
                eprintln!();
                eprintln!(
                    "{}",
                    "✗ inventory にホスト名が欠けた行があります".red().bold()
                );
                eprintln!(
                    "{} を手動で修正するか、スタック {} を削除してやり直してください。",
                    inventory.path.display(),
                    run.name
                );
                return Ok(Outcome::InvalidInventory);
            }
            Ok(Outcome::Success)
        }
    }
}

/// ネットワーク構成を決定
///
/// `--no-vpc` > フラグの VPC/サブネット > 設定ファイル > フラット の順。
fn resolve_network(
    args: &CreateArgs,
    config: &fleetstack_config::Settings,
) -> fleetstack_core::Result<NetworkMode> {
    if args.no_vpc {
        return Ok(NetworkMode::Flat);
    }
    if let Some(network) = NetworkMode::from_ids(args.vpc_id.clone(), args.subnet_id.clone())? {
        return Ok(network);
    }
    Ok(config
        .subnet(&args.region)
        .map(|pair| NetworkMode::Subnet {
            vpc_id: pair.vpc_id.clone(),
            subnet_id: pair.subnet_id.clone(),
        })
        .unwrap_or_default())
}

fn build_topology(args: &CreateArgs, network: NetworkMode) -> fleetstack_core::Result<Topology> {
    let mut request = TopologyRequest {
        name: args.name.clone(),
        region: args.region.clone(),
        network,
        cds: args.cds,
        haproxy: args.haproxy,
        cli_all: args.cli_all,
        cli_only: args.cli_only,
        dns: args.dns,
        nfs: args.nfs,
        test: args.test,
        ..Default::default()
    };

    for raw in &args.clients {
        let (version, count) = parse_client_count(raw)?;
        request.clients.entry(version).or_default().count = count;
    }
    for raw in &args.client_archs {
        let (version, architectures) = parse_client_archs(raw)?;
        request.clients.entry(version).or_default().architectures = architectures;
    }

    let mut topology = request.into_topology();
    for raw in &args.role_amis {
        let (stem, ami) = split_assignment(raw)?;
        let spec = topology
            .roles
            .iter_mut()
            .find(|spec| spec.stem == stem)
            .ok_or_else(|| {
                FleetError::InvalidConfig(format!("ロール '{}' はこのスタックにありません", stem))
            })?;
        spec.ami_override = Some(ami.to_string());
    }

    Ok(topology)
}

fn build_settings(
    args: &CreateArgs,
    config: &fleetstack_config::Settings,
) -> anyhow::Result<ProvisionSettings> {
    let (key_name, private_key_path) = match config.key_pair(&args.region) {
        Some(pair) => (pair.name.clone(), Some(pair.private_key_path.clone())),
        None => {
            let name = args
                .key_pair_name
                .clone()
                .or_else(|| std::env::var("USER").ok())
                .context(
                    "キーペア名を決定できません\nヒント: --key-pair-name を指定するか、設定ファイルに ssh を定義してください",
                )?;
            (name, None)
        }
    };

    let mut settings = ProvisionSettings::new(&args.region, key_name)?;
    settings.private_key_path = private_key_path;
    settings.ssh_extra_args = args.ansible_ssh_extra_args.clone();
    settings.parameters = args
        .parameters
        .iter()
        .map(|raw| parse_parameter(raw))
        .collect::<fleetstack_core::Result<_>>()?;
    settings.timeout_minutes = args.timeout;
    if args.full_os_tags {
        settings.os_tag_style = OsTagStyle::Full;
    }
    settings.stack_poll = settings
        .stack_poll
        .with_deadline(Duration::from_secs(u64::from(args.timeout) * 60) + STACK_DEADLINE_GRACE);
    settings.hostname_poll = settings.hostname_poll.with_deadline(HOSTNAME_DEADLINE);

    Ok(settings)
}

fn split_assignment(raw: &str) -> fleetstack_core::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Ok((key.trim(), value.trim()))
        }
        _ => Err(FleetError::InvalidConfig(format!(
            "KEY=VALUE の形式で指定してください: {}",
            raw
        ))),
    }
}

/// `8=2` / `9=all`
fn parse_client_count(raw: &str) -> fleetstack_core::Result<(RhelVersion, Count)> {
    let (version, count) = split_assignment(raw)?;
    let version: RhelVersion = version.parse()?;
    let count = if count.eq_ignore_ascii_case("all") {
        Count::PerArchitecture
    } else {
        Count::Fixed(count.parse().map_err(|_| {
            FleetError::InvalidConfig(format!("クライアント台数が不正です: {}", raw))
        })?)
    };
    Ok((version, count))
}

/// `9=arm64,x86_64`
fn parse_client_archs(
    raw: &str,
) -> fleetstack_core::Result<(RhelVersion, Vec<Option<Architecture>>)> {
    let (version, list) = split_assignment(raw)?;
    Ok((version.parse()?, Architecture::parse_list(list)?))
}

/// `8=ami-x` / `9:arm64=ami-y`
fn parse_ami_overrides(raws: &[String]) -> fleetstack_core::Result<ImageOverrides> {
    let mut overrides = ImageOverrides::new();
    for raw in raws {
        let (key, ami) = split_assignment(raw)?;
        let (version, arch) = match key.split_once(':') {
            Some((version, arch)) => (version.parse()?, arch.parse()?),
            None => (key.parse()?, Architecture::PRIMARY),
        };
        overrides.insert((version, arch), ami.to_string());
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use fleetstack_core::Role;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: CreateArgs,
    }

    fn args(extra: &[&str]) -> CreateArgs {
        let mut argv = vec!["fleetstack"];
        argv.extend_from_slice(extra);
        TestCli::parse_from(argv).args
    }

    fn rhel(major: u8) -> RhelVersion {
        RhelVersion::new(major).unwrap()
    }

    #[test]
    fn test_parse_client_count() {
        assert_eq!(
            parse_client_count("8=2").unwrap(),
            (rhel(8), Count::Fixed(2))
        );
        assert_eq!(
            parse_client_count("9=all").unwrap(),
            (rhel(9), Count::PerArchitecture)
        );
        assert!(parse_client_count("4=1").is_err());
        assert!(parse_client_count("8=many").is_err());
        assert!(parse_client_count("8").is_err());
    }

    #[test]
    fn test_parse_client_archs() {
        let (version, archs) = parse_client_archs("9=arm64,x86_64").unwrap();
        assert_eq!(version, rhel(9));
        assert_eq!(
            archs,
            vec![Some(Architecture::Arm64), Some(Architecture::X86_64)]
        );
        assert!(parse_client_archs("9=sparc").is_err());
    }

    #[test]
    fn test_parse_ami_overrides() {
        let overrides = parse_ami_overrides(&[
            "8=ami-rhel8".to_string(),
            "9:arm64=ami-rhel9-arm".to_string(),
        ])
        .unwrap();
        assert_eq!(
            overrides.get(&(rhel(8), Architecture::X86_64)).map(String::as_str),
            Some("ami-rhel8")
        );
        assert_eq!(
            overrides.get(&(rhel(9), Architecture::Arm64)).map(String::as_str),
            Some("ami-rhel9-arm")
        );
        assert!(parse_ami_overrides(&["9:ppc=ami-x".to_string()]).is_err());
    }

    #[test]
    fn test_network_precedence() {
        let mut config = fleetstack_config::Settings::default();
        config.vpc.insert(
            "eu-west-1".into(),
            ("vpc-cfg".to_string(), "subnet-cfg".to_string()).into(),
        );

        let network = resolve_network(&args(&[]), &config).unwrap();
        assert_eq!(network.vpc_id(), Some("vpc-cfg"));

        let network = resolve_network(
            &args(&["--vpc-id", "vpc-flag", "--subnet-id", "subnet-flag"]),
            &config,
        )
        .unwrap();
        assert_eq!(network.subnet_id(), Some("subnet-flag"));

        let network = resolve_network(&args(&["--no-vpc"]), &config).unwrap();
        assert_eq!(network, NetworkMode::Flat);

        assert!(resolve_network(&args(&["--vpc-id", "vpc-flag"]), &config).is_err());

        let empty = fleetstack_config::Settings::default();
        assert_eq!(
            resolve_network(&args(&["-r", "us-east-1"]), &empty).unwrap(),
            NetworkMode::Flat
        );
    }

    #[test]
    fn test_build_topology_from_flags() {
        let topology = build_topology(
            &args(&["--cli", "8=2", "--cli-arch", "8=arm64", "--cds", "2", "--dns"]),
            NetworkMode::Flat,
        )
        .unwrap();
        assert_eq!(topology.count_of(Role::Cds), 2);
        assert_eq!(topology.count_of(Role::Cli), 2);
        assert!(topology.has_role(Role::Dns));
        // arm64 はフラットネットワークでは起動できない
        assert!(topology.validate().is_err());
    }

    #[test]
    fn test_role_ami_override() {
        let topology =
            build_topology(&args(&["--role-ami", "cds=ami-custom"]), NetworkMode::Flat).unwrap();
        let cds = topology.roles.iter().find(|r| r.role == Role::Cds).unwrap();
        assert_eq!(cds.ami_override.as_deref(), Some("ami-custom"));

        assert!(build_topology(&args(&["--role-ami", "nfs=ami-x"]), NetworkMode::Flat).is_err());
    }

    #[test]
    fn test_settings_from_config_key_pair() {
        let mut config = fleetstack_config::Settings::default();
        config.ssh.insert(
            "eu-west-1".into(),
            (
                "jdoe-eu".to_string(),
                "/home/jdoe/.ssh/jdoe-eu.pem".to_string(),
            )
                .into(),
        );

        let settings = build_settings(
            &args(&["--parameters", "Env=qa", "--timeout", "20", "--full-os-tags"]),
            &config,
        )
        .unwrap();
        assert_eq!(settings.key_name, "jdoe-eu");
        assert_eq!(settings.identity, "jdoe");
        assert_eq!(
            settings.private_key_path.as_deref(),
            Some("/home/jdoe/.ssh/jdoe-eu.pem")
        );
        assert_eq!(settings.parameters, vec![("Env".into(), "qa".into())]);
        assert_eq!(settings.timeout_minutes, 20);
        assert_eq!(settings.os_tag_style, OsTagStyle::Full);
        assert_eq!(
            settings.stack_poll.deadline,
            Some(Duration::from_secs(35 * 60))
        );
        assert_eq!(settings.hostname_poll.deadline, Some(HOSTNAME_DEADLINE));
    }

    #[test]
    fn test_settings_key_pair_flag_fallback() {
        let config = fleetstack_config::Settings::default();
        let settings =
            build_settings(&args(&["--key-pair-name", "qa-team"]), &config).unwrap();
        assert_eq!(settings.key_name, "qa-team");
        assert_eq!(settings.identity, "qa");
        assert_eq!(settings.private_key_path, None);

        assert!(build_settings(&args(&["--parameters", "broken"]), &config).is_err());
    }
}
