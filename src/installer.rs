//! Installer pipeline
//!
//! Runs the whole decision chain for one host: validate parameters, resolve
//! the platform profile, render the main document and every drop-in, then
//! calculate the plan. Every check runs before the first action exists, so a
//! failing run produces no partial plan.

use crate::document::{self, ConfigDocument};
use crate::engine::plan::{DropInFile, ProvisionPlan, calculate_provision_plan};
use crate::error::Result;
use crate::facts::HostFacts;
use crate::logic::resolver::{PlatformProfile, resolve_with_defaults};
use crate::params::ProvisionParams;
use crate::profiles::PlatformDefaults;

/// Everything decided for one host.
#[derive(Debug, Clone)]
pub struct Provisioning {
    pub profile: PlatformProfile,
    pub document: ConfigDocument,
    pub drop_ins: Vec<DropInFile>,
    pub plan: ProvisionPlan,
}

/// Build the plan for a host with the built-in defaults.
pub fn build_plan(facts: &HostFacts, params: &ProvisionParams) -> Result<ProvisionPlan> {
    build_plan_with_defaults(facts, params, &PlatformDefaults::default())
}

pub fn build_plan_with_defaults(
    facts: &HostFacts,
    params: &ProvisionParams,
    defaults: &PlatformDefaults,
) -> Result<ProvisionPlan> {
    prepare(facts, params, defaults).map(|p| p.plan)
}

/// Run the full pipeline and keep the intermediate results.
pub fn prepare(
    facts: &HostFacts,
    params: &ProvisionParams,
    defaults: &PlatformDefaults,
) -> Result<Provisioning> {
    params.validate()?;
    let profile = resolve_with_defaults(facts, params, defaults)?;
    let document = document::render(&params.plugin_tree()?)?;
    let drop_ins = render_drop_ins(params)?;

    let plan = calculate_provision_plan(&profile, params, &document, &drop_ins);
    tracing::info!(
        "Planned {} actions for {} ({} drop-ins)",
        plan.actions.len(),
        profile.os_family,
        drop_ins.len()
    );

    Ok(Provisioning {
        profile,
        document,
        drop_ins,
        plan,
    })
}

/// Render every configured drop-in fragment, in the order supplied.
pub fn render_drop_ins(params: &ProvisionParams) -> Result<Vec<DropInFile>> {
    params
        .drop_ins
        .iter()
        .map(|drop_in| {
            let document =
                document::render_fragment(drop_in.category, &drop_in.plugin, &drop_in.instances()?)?;
            Ok(DropInFile {
                file_name: drop_in.file_name(),
                document,
            })
        })
        .collect()
}
