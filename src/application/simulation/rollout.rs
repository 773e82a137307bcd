use super::action_mapping::{ActionMapping, TradingAccount};
use crate::application::market_data::MarketFeatures;
use crate::domain::errors::{InsightError, InsightResult};
use crate::domain::ports::TradingPolicy;

/// Result of stepping a policy through a feature window.
#[derive(Debug, Clone, PartialEq)]
pub struct Rollout {
    /// Executed shares per step, after the cash and holdings caps; one fewer
    /// than the number of bars.
    pub actions: Vec<f64>,
    /// Account value at every bar close, starting at the initial amount.
    pub equity: Vec<f64>,
    /// Account state after the last step.
    pub account: TradingAccount,
}

/// Steps `policy` through `window`: at each bar but the last, observe, act,
/// trade at that bar's close, then mark the account at the next close.
pub fn replay(
    policy: &dyn TradingPolicy,
    window: &[MarketFeatures],
    mapping: &ActionMapping,
) -> InsightResult<Rollout> {
    if window.is_empty() {
        return Err(InsightError::InvalidWindow(
            "Empty testing dataset produced.".to_string(),
        ));
    }

    let mut account = TradingAccount::new(mapping.initial_amount);
    let mut actions = Vec::with_capacity(window.len() - 1);
    let mut equity = Vec::with_capacity(window.len());
    equity.push(mapping.initial_amount);

    for step in window.windows(2) {
        let (today, tomorrow) = (&step[0], &step[1]);
        let requested = act_on(policy, today, &account, mapping)?;
        let executed = account.execute(requested, today.close, mapping);
        actions.push(executed);
        equity.push(account.equity(tomorrow.close));
    }

    Ok(Rollout {
        actions,
        equity,
        account,
    })
}

/// Queries the policy for one bar and returns the requested share count.
pub fn act_on(
    policy: &dyn TradingPolicy,
    features: &MarketFeatures,
    account: &TradingAccount,
    mapping: &ActionMapping,
) -> InsightResult<f64> {
    let observation = features.observation(account.cash, account.shares);
    if observation.len() != policy.observation_dim() {
        return Err(InsightError::ModelUnavailable(format!(
            "policy '{}' expects {} observation values, feature builder produces {}",
            policy.name(),
            policy.observation_dim(),
            observation.len()
        )));
    }
    let action = policy.act(&observation)?;
    Ok(mapping.shares_for(action))
}
