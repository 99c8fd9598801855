//! Targeted rebate overlay on scenario bills
//!
//! Eligible households in each archetype get a flat rebate off their
//! scenario bill. Optionally the rebate fund is recovered evenly from every
//! ineligible household.

use log::info;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::archetype::{Archetype, EligibilityTable, INCOME_DECILES_COLUMN, SIZE_COLUMN};
use crate::error::{divide, LevyError, Result};
use crate::scenario::{BillRecord, BASELINE, TOTAL_BILL};

/// Archetype left out of rebate tables
pub const TYPICAL_PROFILE: &str = "Typical";

/// Which households qualify for the rebate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EligibilityCriteria {
    #[serde(rename = "Cold Weather Payments")]
    ColdWeatherPayments,
    #[serde(rename = "ECO")]
    Eco,
    #[serde(rename = "Warm Homes Discount")]
    WarmHomesDiscount,
    #[serde(rename = "Winter Fuel Payments")]
    WinterFuelPayments,
    #[serde(rename = "Retired Economic Status")]
    RetiredEconomicStatus,
    #[serde(rename = "Pension Guarantee Credit")]
    PensionGuaranteeCredit,
    #[serde(rename = "Pension Savings Credit")]
    PensionSavingsCredit,
    #[serde(rename = "Income Deciles")]
    IncomeDeciles,
}

impl EligibilityCriteria {
    pub const ALL: [EligibilityCriteria; 8] = [
        EligibilityCriteria::ColdWeatherPayments,
        EligibilityCriteria::Eco,
        EligibilityCriteria::WarmHomesDiscount,
        EligibilityCriteria::WinterFuelPayments,
        EligibilityCriteria::RetiredEconomicStatus,
        EligibilityCriteria::PensionGuaranteeCredit,
        EligibilityCriteria::PensionSavingsCredit,
        EligibilityCriteria::IncomeDeciles,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EligibilityCriteria::ColdWeatherPayments => "Cold Weather Payments",
            EligibilityCriteria::Eco => "ECO",
            EligibilityCriteria::WarmHomesDiscount => "Warm Homes Discount",
            EligibilityCriteria::WinterFuelPayments => "Winter Fuel Payments",
            EligibilityCriteria::RetiredEconomicStatus => "Retired Economic Status",
            EligibilityCriteria::PensionGuaranteeCredit => "Pension Guarantee Credit",
            EligibilityCriteria::PensionSavingsCredit => "Pension Savings Credit",
            EligibilityCriteria::IncomeDeciles => "Income Deciles",
        }
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.label()).collect()
    }

    /// Eligibility table column holding the eligible household count
    pub fn column(&self) -> &'static str {
        match self {
            EligibilityCriteria::ColdWeatherPayments => "CWPEligibleSize",
            EligibilityCriteria::Eco => "ECOEligibleSize",
            EligibilityCriteria::WarmHomesDiscount => "WHDEligibleSize",
            EligibilityCriteria::WinterFuelPayments => "WFPEligibleSize",
            EligibilityCriteria::RetiredEconomicStatus => "RetiredEconomicStatusSize",
            // No separate savings credit count is published
            EligibilityCriteria::PensionGuaranteeCredit | EligibilityCriteria::PensionSavingsCredit => {
                "PensionGuaranteeCreditRecipients"
            }
            EligibilityCriteria::IncomeDeciles => INCOME_DECILES_COLUMN,
        }
    }
}

impl fmt::Display for EligibilityCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EligibilityCriteria {
    type Err = LevyError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| LevyError::UnknownEligibilityCriteria(s.to_string()))
    }
}

/// Rebate to overlay on one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateRequest {
    pub scenario: String,
    /// £ off each eligible household's bill
    pub rebate: f64,
    pub criteria: EligibilityCriteria,
    /// Number of lowest income deciles eligible; 0 when not income based
    #[serde(default)]
    pub eligible_deciles: usize,
    /// Recover the rebate fund from ineligible households
    #[serde(default = "default_ineligible_households_pay")]
    pub ineligible_households_pay: bool,
}

fn default_ineligible_households_pay() -> bool { true }

impl RebateRequest {
    /// Criteria description for output rows
    pub fn criteria_label(&self) -> String {
        if self.eligible_deciles == 0 {
            self.criteria.label().to_string()
        } else {
            format!("{} Lowest {}", self.eligible_deciles, self.criteria.label())
        }
    }
}

/// Bills for one archetype with the rebate applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsidisationRow {
    #[serde(rename = "AnnualConsumptionProfile")]
    pub archetype: String,
    pub scenario: String,
    #[serde(rename = "ArchetypeSize")]
    pub archetype_size: f64,
    #[serde(rename = "ScenarioBaseBill")]
    pub scenario_base_bill: f64,
    #[serde(rename = "CurrentBaselineBill")]
    pub current_baseline_bill: f64,
    #[serde(rename = "EligibilityCriteria")]
    pub eligibility_criteria: String,
    #[serde(rename = "NumberOfEligibleHouseholds")]
    pub eligible_households: f64,
    #[serde(rename = "TotalRequiredRebateAmount")]
    pub total_required_rebate: f64,
    #[serde(rename = "EligibleHouseholdBill")]
    pub eligible_bill: f64,
    #[serde(rename = "EligibleHouseholdBillChangeFromCurrentBill")]
    pub eligible_bill_change: f64,
    #[serde(rename = "NumberOfIneligibleHouseholds")]
    pub ineligible_households: f64,
    #[serde(rename = "IneligibleHouseholdBill")]
    pub ineligible_bill: f64,
    #[serde(rename = "IneligibleHouseholdBillChangeFromCurrentBill")]
    pub ineligible_bill_change: f64,
}

fn total_bill(bills: &[BillRecord], scenario: &str, archetype: &str) -> Result<f64> {
    if !bills.iter().any(|b| b.scenario == scenario) {
        return Err(LevyError::MissingScenario(scenario.to_string()));
    }
    bills
        .iter()
        .find(|b| b.scenario == scenario && b.archetype == archetype && b.variable == TOTAL_BILL)
        .map(|b| b.value)
        .ok_or_else(|| LevyError::MissingArchetype(archetype.to_string()))
}

/// Overlay a rebate onto a scenario's total bills
///
/// `bills` must hold both the requested scenario and the Baseline. Rows are
/// ordered by archetype profile.
pub fn subsidisation_table(
    bills: &[BillRecord],
    archetypes: &[Archetype],
    eligibility: &EligibilityTable,
    request: &RebateRequest,
) -> Result<Vec<SubsidisationRow>> {
    let mut targeted: Vec<&Archetype> = archetypes.iter().filter(|a| a.profile != TYPICAL_PROFILE).collect();
    targeted.sort_by(|a, b| a.profile.cmp(&b.profile));

    let criteria_label = request.criteria_label();
    let mut rows = Vec::with_capacity(targeted.len());

    for archetype in targeted {
        let profile = archetype.profile.as_str();
        let archetype_size = match archetype.size {
            Some(size) => size,
            None => eligibility.value(profile, SIZE_COLUMN)?,
        };
        let scenario_base_bill = total_bill(bills, &request.scenario, profile)?;
        let current_baseline_bill = total_bill(bills, BASELINE, profile)?;
        let eligible_households = eligibility.value(profile, request.criteria.column())?;
        let eligible_bill = scenario_base_bill - request.rebate;

        rows.push(SubsidisationRow {
            archetype: profile.to_string(),
            scenario: request.scenario.clone(),
            archetype_size,
            scenario_base_bill,
            current_baseline_bill,
            eligibility_criteria: criteria_label.clone(),
            eligible_households,
            total_required_rebate: request.rebate * eligible_households,
            eligible_bill,
            eligible_bill_change: eligible_bill - current_baseline_bill,
            ineligible_households: archetype_size - eligible_households,
            ineligible_bill: scenario_base_bill,
            ineligible_bill_change: 0.0,
        });
    }

    let rebate_fund: f64 = rows.iter().map(|r| r.total_required_rebate).sum();
    // An empty fund needs no one to pay into it
    let rebate_payment = if request.ineligible_households_pay && rebate_fund != 0.0 {
        let ineligible: f64 = rows.iter().map(|r| r.ineligible_households).sum();
        divide(rebate_fund, ineligible, "by ineligible households")?
    } else {
        0.0
    };
    for row in &mut rows {
        row.ineligible_bill = row.scenario_base_bill + rebate_payment;
        row.ineligible_bill_change = row.ineligible_bill - row.current_baseline_bill;
    }

    info!(
        "Rebate of £{:.2} for '{}' in '{}': fund £{:.0}, £{:.2} per ineligible household",
        request.rebate, criteria_label, request.scenario, rebate_fund, rebate_payment
    );
    Ok(rows)
}
