//! Loans In procedure (Spectrum 5.0).
//!
//! Tracks an object borrowed from another institution from loan request
//! through lender approval, agreement, receipt, display, and return.
//!
//! See <https://collectionstrust.org.uk/spectrum/procedures/loans-in/>

use serde_json::json;
use trellis_core::{Schema, SourceSpec, StateDef, TransitionDef};

pub const IDENTIFIER: &str = "loan_in";

fn state(
    id: &str,
    label: &str,
    description: &str,
    color: &str,
    icon: &str,
    phase: &str,
    progress: u64,
) -> StateDef {
    StateDef::new(id)
        .with_label(label)
        .with_description(description)
        .with_color(color)
        .with_icon(icon)
        .with_phase(phase)
        .with_attr("progress", json!(progress))
}

/// Builds the loans-in schema. Constructed once per application and shared.
pub fn schema() -> Schema {
    let builder = Schema::builder(IDENTIFIER, "Loan In (Spectrum 5.0)")
        .initial("request_submitted")
        // "declined_by_lender" is terminal alongside closed/cancelled: a
        // declined request re-enters as a fresh loan record.
        .final_states(["closed", "cancelled", "declined_by_lender"])
        .state(state(
            "request_submitted",
            "Request Submitted",
            "Loan request submitted to lender",
            "info",
            "paper-plane",
            "request",
            5,
        ))
        .state(state(
            "awaiting_response",
            "Awaiting Response",
            "Waiting for lender response",
            "warning",
            "clock",
            "request",
            10,
        ))
        .state(state(
            "approved_by_lender",
            "Approved by Lender",
            "Lender has approved the loan",
            "success",
            "check",
            "preparation",
            15,
        ))
        .state(state(
            "declined_by_lender",
            "Declined by Lender",
            "Lender has declined the loan request",
            "danger",
            "times",
            "closed",
            100,
        ))
        .state(state(
            "agreement_drafting",
            "Agreement Drafting",
            "Loan agreement being drafted",
            "info",
            "file-alt",
            "preparation",
            20,
        ))
        .state(state(
            "agreement_review",
            "Agreement Under Review",
            "Agreement being reviewed by lender",
            "warning",
            "search",
            "preparation",
            25,
        ))
        .state(state(
            "agreement_signed",
            "Agreement Signed",
            "Loan agreement signed by both parties",
            "success",
            "file-signature",
            "preparation",
            30,
        ))
        .state(state(
            "insurance_arranged",
            "Insurance Arranged",
            "Insurance coverage arranged",
            "success",
            "shield-check",
            "preparation",
            35,
        ))
        .state(state(
            "facilities_report_pending",
            "Facilities Report Pending",
            "Awaiting facilities report approval",
            "warning",
            "building",
            "preparation",
            40,
        ))
        .state(state(
            "facilities_approved",
            "Facilities Approved",
            "Display/storage facilities approved by lender",
            "success",
            "building",
            "preparation",
            45,
        ))
        .state(state(
            "transport_arranged",
            "Transport Arranged",
            "Transport/courier arranged",
            "info",
            "truck",
            "transit",
            50,
        ))
        .state(state(
            "in_transit_inbound",
            "In Transit (Inbound)",
            "Object in transit from lender",
            "primary",
            "shipping-fast",
            "transit",
            55,
        ))
        .state(state(
            "received",
            "Received",
            "Object received at our institution",
            "success",
            "hand-holding",
            "on_loan",
            60,
        ))
        .state(state(
            "condition_checked",
            "Condition Checked",
            "Condition check completed upon receipt",
            "success",
            "clipboard-check",
            "on_loan",
            65,
        ))
        .state(state(
            "on_display",
            "On Display",
            "Object on display in exhibition",
            "primary",
            "image",
            "on_loan",
            70,
        ))
        .state(state(
            "in_storage",
            "In Storage",
            "Object in temporary storage",
            "secondary",
            "warehouse",
            "on_loan",
            70,
        ))
        .state(state(
            "return_preparation",
            "Return Preparation",
            "Preparing object for return",
            "info",
            "undo",
            "return",
            75,
        ))
        .state(state(
            "return_condition_check",
            "Return Condition Check",
            "Pre-return condition assessment",
            "warning",
            "clipboard",
            "return",
            80,
        ))
        .state(state(
            "return_packed",
            "Packed for Return",
            "Object packed for return transport",
            "info",
            "box",
            "return",
            85,
        ))
        .state(state(
            "in_transit_outbound",
            "In Transit (Return)",
            "Object in transit back to lender",
            "primary",
            "shipping-fast",
            "return",
            90,
        ))
        .state(state(
            "returned_to_lender",
            "Returned to Lender",
            "Object returned and received by lender",
            "success",
            "check-circle",
            "return",
            95,
        ))
        .state(state(
            "closed",
            "Closed",
            "Loan completed and closed",
            "secondary",
            "archive",
            "closed",
            100,
        ))
        .state(state(
            "cancelled",
            "Cancelled",
            "Loan cancelled",
            "danger",
            "ban",
            "closed",
            100,
        ));

    let builder = builder
        // Request phase
        .transition(
            TransitionDef::new("send_request", "request_submitted", "awaiting_response")
                .with_label("Send Request")
                .with_icon("paper-plane")
                .with_color("info")
                .with_roles(["curator", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("lender_approves", "awaiting_response", "approved_by_lender")
                .with_label("Lender Approves")
                .with_icon("check")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("lender_declines", "awaiting_response", "declined_by_lender")
                .with_label("Lender Declines")
                .with_icon("times")
                .with_color("danger")
                .with_roles(["registrar", "administrator"]),
        )
        // Agreement phase
        .transition(
            TransitionDef::new("draft_agreement", "approved_by_lender", "agreement_drafting")
                .with_label("Draft Agreement")
                .with_icon("file-alt")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("send_for_review", "agreement_drafting", "agreement_review")
                .with_label("Send for Review")
                .with_icon("paper-plane")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("agreement_signed", "agreement_review", "agreement_signed")
                .with_label("Agreement Signed")
                .with_icon("file-signature")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("revise_agreement", "agreement_review", "agreement_drafting")
                .with_label("Revise Agreement")
                .with_icon("edit")
                .with_color("warning")
                .with_roles(["registrar", "administrator"]),
        )
        // Insurance and facilities
        .transition(
            TransitionDef::new("arrange_insurance", "agreement_signed", "insurance_arranged")
                .with_label("Arrange Insurance")
                .with_icon("shield")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("submit_facilities_report", "insurance_arranged", "facilities_report_pending")
                .with_label("Submit Facilities Report")
                .with_icon("building")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("facilities_approved", "facilities_report_pending", "facilities_approved")
                .with_label("Facilities Approved")
                .with_icon("check")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        // Transport
        .transition(
            TransitionDef::new("arrange_transport", "facilities_approved", "transport_arranged")
                .with_label("Arrange Transport")
                .with_icon("truck")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("object_dispatched", "transport_arranged", "in_transit_inbound")
                .with_label("Object Dispatched")
                .with_icon("shipping-fast")
                .with_color("primary")
                .with_roles(["registrar", "administrator"]),
        )
        // Receipt
        .transition(
            TransitionDef::new("receive_object", "in_transit_inbound", "received")
                .with_label("Receive Object")
                .with_icon("hand-holding")
                .with_color("success")
                .with_roles(["registrar", "art_handler", "administrator"])
                .confirm("Confirm object has been received?"),
        )
        .transition(
            TransitionDef::new("complete_condition_check", "received", "condition_checked")
                .with_label("Complete Condition Check")
                .with_icon("clipboard-check")
                .with_color("success")
                .with_roles(["conservator", "registrar", "administrator"]),
        )
        // On loan
        .transition(
            TransitionDef::new("put_on_display", ["condition_checked", "in_storage"], "on_display")
                .with_label("Put On Display")
                .with_icon("image")
                .with_color("primary")
                .with_roles(["registrar", "curator", "administrator"]),
        )
        .transition(
            TransitionDef::new("move_to_storage", ["condition_checked", "on_display"], "in_storage")
                .with_label("Move to Storage")
                .with_icon("warehouse")
                .with_color("secondary")
                .with_roles(["registrar", "administrator"]),
        )
        // Return phase
        .transition(
            TransitionDef::new("initiate_return", ["on_display", "in_storage"], "return_preparation")
                .with_label("Initiate Return")
                .with_icon("undo")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("return_condition_check", "return_preparation", "return_condition_check")
                .with_label("Condition Check")
                .with_icon("clipboard")
                .with_color("warning")
                .with_roles(["conservator", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("pack_for_return", "return_condition_check", "return_packed")
                .with_label("Pack for Return")
                .with_icon("box")
                .with_color("info")
                .with_roles(["art_handler", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("dispatch_return", "return_packed", "in_transit_outbound")
                .with_label("Dispatch Return")
                .with_icon("truck")
                .with_color("primary")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("confirm_return_receipt", "in_transit_outbound", "returned_to_lender")
                .with_label("Confirm Return Receipt")
                .with_icon("check-circle")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("close_loan", "returned_to_lender", "closed")
                .with_label("Close Loan")
                .with_icon("archive")
                .with_color("secondary")
                .with_roles(["registrar", "administrator"])
                .confirm("Close this loan record?"),
        )
        // Cancellation, possible until the object leaves the lender
        .transition(
            TransitionDef::new(
                "cancel",
                SourceSpec::states([
                    "request_submitted",
                    "awaiting_response",
                    "approved_by_lender",
                    "agreement_drafting",
                    "agreement_review",
                    "agreement_signed",
                    "insurance_arranged",
                    "facilities_report_pending",
                    "facilities_approved",
                    "transport_arranged",
                ]),
                "cancelled",
            )
            .with_label("Cancel Loan")
            .with_icon("ban")
            .with_color("danger")
            .with_roles(["registrar", "director", "administrator"])
            .confirm("Cancel this loan? This action cannot be undone."),
        );

    builder
        .build()
        .unwrap_or_else(|e| panic!("loan_in schema is malformed: {e}"))
}
