//! Loans Out procedure (Spectrum 5.0).
//!
//! Tracks an object lent to another institution from loan request through
//! approval, preparation, dispatch, display at the borrower, and return.
//!
//! See <https://collectionstrust.org.uk/spectrum/procedures/loans-out/>

use serde_json::json;
use trellis_core::{Schema, SourceSpec, StateDef, TransitionDef};

pub const IDENTIFIER: &str = "loan_out";

/// Phase identifiers and their display labels, in procedure order.
pub const PHASE_LABELS: &[(&str, &str)] = &[
    ("request", "Request & Approval"),
    ("preparation", "Preparation"),
    ("dispatch", "Dispatch"),
    ("transit", "Transit"),
    ("on_loan", "On Loan"),
    ("return", "Return"),
    ("closed", "Closed"),
];

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

/// Builds the loans-out schema. Constructed once per application and shared.
pub fn schema() -> Schema {
    let builder = Schema::builder(IDENTIFIER, "Loan Out (Spectrum 5.0)")
        .initial("request_received")
        // "rejected" is terminal alongside closed/cancelled: a rejected
        // request re-enters as a fresh loan record, not via a transition.
        .final_states(["closed", "cancelled", "rejected"])
        .state(state(
            "request_received",
            "Request Received",
            "Loan request received from borrower",
            "info",
            "inbox",
            "request",
            5,
        ))
        .state(state(
            "under_review",
            "Under Review",
            "Request being reviewed by curatorial staff",
            "warning",
            "search",
            "request",
            10,
        ))
        .state(state(
            "approved",
            "Approved",
            "Loan request approved",
            "success",
            "check",
            "preparation",
            15,
        ))
        .state(state(
            "rejected",
            "Rejected",
            "Loan request declined",
            "danger",
            "times",
            "closed",
            100,
        ))
        .state(state(
            "agreement_pending",
            "Agreement Pending",
            "Awaiting signed loan agreement",
            "warning",
            "file-text",
            "preparation",
            20,
        ))
        .state(state(
            "agreement_signed",
            "Agreement Signed",
            "Loan agreement signed by both parties",
            "success",
            "file-signature",
            "preparation",
            25,
        ))
        .state(state(
            "insurance_pending",
            "Insurance Pending",
            "Awaiting insurance confirmation",
            "warning",
            "shield",
            "preparation",
            30,
        ))
        .state(state(
            "insurance_confirmed",
            "Insurance Confirmed",
            "Insurance coverage confirmed",
            "success",
            "shield-check",
            "preparation",
            35,
        ))
        .state(state(
            "condition_check",
            "Condition Check",
            "Pre-loan condition assessment in progress",
            "info",
            "clipboard-check",
            "preparation",
            40,
        ))
        .state(state(
            "condition_complete",
            "Condition Complete",
            "Condition report completed and signed",
            "success",
            "clipboard-check",
            "preparation",
            45,
        ))
        .state(state(
            "packing",
            "Packing",
            "Object being packed for transport",
            "info",
            "box",
            "dispatch",
            50,
        ))
        .state(state(
            "packed",
            "Packed",
            "Object packed and ready for dispatch",
            "success",
            "box-check",
            "dispatch",
            55,
        ))
        .state(state(
            "courier_arranged",
            "Courier Arranged",
            "Transport/courier arrangements confirmed",
            "info",
            "truck",
            "dispatch",
            60,
        ))
        .state(state(
            "dispatched",
            "Dispatched",
            "Object dispatched to borrower",
            "primary",
            "truck-loading",
            "transit",
            65,
        ))
        .state(state(
            "in_transit",
            "In Transit",
            "Object in transit to borrower",
            "info",
            "shipping-fast",
            "transit",
            70,
        ))
        .state(state(
            "received_by_borrower",
            "Received by Borrower",
            "Borrower has received and inspected object",
            "success",
            "hand-holding",
            "on_loan",
            75,
        ))
        .state(state(
            "on_display",
            "On Display",
            "Object on display at borrower venue",
            "primary",
            "image",
            "on_loan",
            80,
        ))
        .state(state(
            "in_storage_borrower",
            "In Storage (Borrower)",
            "Object in storage at borrower location",
            "secondary",
            "warehouse",
            "on_loan",
            80,
        ))
        .state(state(
            "return_initiated",
            "Return Initiated",
            "Return process started",
            "info",
            "undo",
            "return",
            82,
        ))
        .state(state(
            "return_condition_check",
            "Return Condition Check",
            "Post-loan condition assessment at borrower",
            "warning",
            "clipboard",
            "return",
            85,
        ))
        .state(state(
            "return_packed",
            "Return Packed",
            "Object packed for return transport",
            "info",
            "box",
            "return",
            88,
        ))
        .state(state(
            "return_in_transit",
            "Return In Transit",
            "Object in transit back to lender",
            "info",
            "shipping-fast",
            "return",
            90,
        ))
        .state(state(
            "returned",
            "Returned",
            "Object returned and received by lender",
            "success",
            "check-circle",
            "return",
            95,
        ))
        .state(state(
            "return_condition_verified",
            "Return Condition Verified",
            "Post-return condition verified by lender",
            "success",
            "clipboard-check",
            "return",
            98,
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
            TransitionDef::new("start_review", "request_received", "under_review")
                .with_label("Start Review")
                .with_icon("search")
                .with_color("info")
                .with_roles(["curator", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("approve", "under_review", "approved")
                .with_label("Approve Request")
                .with_icon("check")
                .with_color("success")
                .with_roles(["curator", "director", "administrator"])
                .confirm("Approve this loan request?"),
        )
        .transition(
            TransitionDef::new("reject", ["under_review", "request_received"], "rejected")
                .with_label("Reject Request")
                .with_icon("times")
                .with_color("danger")
                .with_roles(["curator", "director", "administrator"])
                .confirm("Reject this loan request? This action cannot be undone."),
        )
        .transition(
            TransitionDef::new("request_more_info", "under_review", "request_received")
                .with_label("Request More Info")
                .with_icon("question-circle")
                .with_color("warning")
                .with_roles(["curator", "registrar", "administrator"]),
        )
        // Agreement phase
        .transition(
            TransitionDef::new("send_agreement", "approved", "agreement_pending")
                .with_label("Send Agreement")
                .with_icon("paper-plane")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("agreement_received", "agreement_pending", "agreement_signed")
                .with_label("Agreement Signed")
                .with_icon("file-signature")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        // Insurance phase
        .transition(
            TransitionDef::new("request_insurance", "agreement_signed", "insurance_pending")
                .with_label("Request Insurance")
                .with_icon("shield")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("confirm_insurance", "insurance_pending", "insurance_confirmed")
                .with_label("Confirm Insurance")
                .with_icon("shield-check")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        // Condition check phase
        .transition(
            TransitionDef::new("start_condition_check", "insurance_confirmed", "condition_check")
                .with_label("Start Condition Check")
                .with_icon("clipboard")
                .with_color("info")
                .with_roles(["conservator", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("complete_condition_check", "condition_check", "condition_complete")
                .with_label("Complete Condition Check")
                .with_icon("clipboard-check")
                .with_color("success")
                .with_roles(["conservator", "registrar", "administrator"]),
        )
        // Packing phase
        .transition(
            TransitionDef::new("start_packing", "condition_complete", "packing")
                .with_label("Start Packing")
                .with_icon("box-open")
                .with_color("info")
                .with_roles(["art_handler", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("complete_packing", "packing", "packed")
                .with_label("Complete Packing")
                .with_icon("box")
                .with_color("success")
                .with_roles(["art_handler", "registrar", "administrator"]),
        )
        // Dispatch phase
        .transition(
            TransitionDef::new("arrange_courier", "packed", "courier_arranged")
                .with_label("Arrange Courier")
                .with_icon("truck")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("dispatch", "courier_arranged", "dispatched")
                .with_label("Dispatch")
                .with_icon("truck-loading")
                .with_color("primary")
                .with_roles(["registrar", "art_handler", "administrator"])
                .confirm("Confirm object has been dispatched?"),
        )
        .transition(
            TransitionDef::new("in_transit", "dispatched", "in_transit")
                .with_label("Mark In Transit")
                .with_icon("shipping-fast")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        // Receipt by borrower
        .transition(
            TransitionDef::new("confirm_receipt", ["in_transit", "dispatched"], "received_by_borrower")
                .with_label("Confirm Receipt")
                .with_icon("hand-holding")
                .with_color("success")
                .with_roles(["registrar", "administrator"]),
        )
        // On loan phase
        .transition(
            TransitionDef::new("put_on_display", ["received_by_borrower", "in_storage_borrower"], "on_display")
                .with_label("Put On Display")
                .with_icon("image")
                .with_color("primary")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("move_to_storage", ["received_by_borrower", "on_display"], "in_storage_borrower")
                .with_label("Move to Storage")
                .with_icon("warehouse")
                .with_color("secondary")
                .with_roles(["registrar", "administrator"]),
        )
        // Return phase
        .transition(
            TransitionDef::new(
                "initiate_return",
                ["on_display", "in_storage_borrower", "received_by_borrower"],
                "return_initiated",
            )
            .with_label("Initiate Return")
            .with_icon("undo")
            .with_color("info")
            .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("return_condition_check", "return_initiated", "return_condition_check")
                .with_label("Start Return Condition Check")
                .with_icon("clipboard")
                .with_color("warning")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("pack_for_return", "return_condition_check", "return_packed")
                .with_label("Pack for Return")
                .with_icon("box")
                .with_color("info")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("dispatch_return", "return_packed", "return_in_transit")
                .with_label("Dispatch Return")
                .with_icon("truck")
                .with_color("primary")
                .with_roles(["registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("receive_return", "return_in_transit", "returned")
                .with_label("Receive Return")
                .with_icon("check-circle")
                .with_color("success")
                .with_roles(["registrar", "art_handler", "administrator"]),
        )
        .transition(
            TransitionDef::new("verify_return_condition", "returned", "return_condition_verified")
                .with_label("Verify Return Condition")
                .with_icon("clipboard-check")
                .with_color("success")
                .with_roles(["conservator", "registrar", "administrator"]),
        )
        .transition(
            TransitionDef::new("close_loan", "return_condition_verified", "closed")
                .with_label("Close Loan")
                .with_icon("archive")
                .with_color("secondary")
                .with_roles(["registrar", "administrator"])
                .confirm("Close this loan record?"),
        )
        // Cancellation, possible until the object leaves the building
        .transition(
            TransitionDef::new(
                "cancel",
                SourceSpec::states([
                    "request_received",
                    "under_review",
                    "approved",
                    "agreement_pending",
                    "agreement_signed",
                    "insurance_pending",
                    "insurance_confirmed",
                    "condition_check",
                    "condition_complete",
                    "packing",
                    "packed",
                    "courier_arranged",
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
        .unwrap_or_else(|e| panic!("loan_out schema is malformed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress;
    use trellis_core::{validate, Context, StateId, Workflow};

    #[test]
    fn test_schema_is_structurally_valid() {
        let report = validate(&schema());
        assert!(report.is_empty(), "unexpected defects: {report:?}");
    }

    #[test]
    fn test_shape() {
        let schema = schema();
        assert_eq!(schema.identifier(), "loan_out");
        assert_eq!(schema.initial(), &StateId::from("request_received"));
        assert_eq!(schema.states().len(), 26);
        assert_eq!(schema.transitions().len(), 26);
        assert!(schema.is_final(&StateId::from("closed")));
        assert!(schema.is_final(&StateId::from("cancelled")));
        assert!(schema.is_final(&StateId::from("rejected")));
    }

    #[test]
    fn test_curator_approves_only_under_review() {
        let workflow = Workflow::new(schema());
        let curator = Context::with_roles(["curator"]);

        assert!(workflow
            .can_transition(&StateId::from("under_review"), "approve", &curator)
            .unwrap());
        assert!(!workflow
            .can_transition(&StateId::from("request_received"), "approve", &curator)
            .unwrap());
    }

    #[test]
    fn test_guest_cannot_approve() {
        let workflow = Workflow::new(schema());
        let guest = Context::with_roles(["guest"]);
        assert!(!workflow
            .can_transition(&StateId::from("under_review"), "approve", &guest)
            .unwrap());
    }

    #[test]
    fn test_cancel_window_closes_at_dispatch() {
        let workflow = Workflow::new(schema());
        let registrar = Context::with_roles(["registrar"]);

        assert!(workflow
            .can_transition(&StateId::from("courier_arranged"), "cancel", &registrar)
            .unwrap());
        assert!(!workflow
            .can_transition(&StateId::from("dispatched"), "cancel", &registrar)
            .unwrap());
        assert!(!workflow
            .can_transition(&StateId::from("on_display"), "cancel", &registrar)
            .unwrap());
    }

    #[test]
    fn test_happy_path_to_closure() {
        let workflow = Workflow::new(schema());
        let ctx = Context::with_roles(["curator", "registrar", "conservator", "art_handler"]);

        let steps = [
            "start_review",
            "approve",
            "send_agreement",
            "agreement_received",
            "request_insurance",
            "confirm_insurance",
            "start_condition_check",
            "complete_condition_check",
            "start_packing",
            "complete_packing",
            "arrange_courier",
            "dispatch",
            "in_transit",
            "confirm_receipt",
            "put_on_display",
            "initiate_return",
            "return_condition_check",
            "pack_for_return",
            "dispatch_return",
            "receive_return",
            "verify_return_condition",
            "close_loan",
        ];

        let mut state = workflow.schema().initial().clone();
        for step in steps {
            state = workflow.apply(&state, step, &ctx).unwrap().to;
        }
        assert_eq!(state, StateId::from("closed"));
        assert!(workflow.schema().is_final(&state));
    }

    #[test]
    fn test_progress_is_monotonic_on_happy_path() {
        let schema = schema();
        let path = [
            "request_received",
            "under_review",
            "approved",
            "agreement_pending",
            "dispatched",
            "returned",
            "closed",
        ];
        let values: Vec<u8> = path
            .iter()
            .map(|s| progress(&schema, &StateId::from(*s)))
            .collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted);
        assert_eq!(progress(&schema, &StateId::from("closed")), 100);
    }

    #[test]
    fn test_every_state_phase_has_a_label() {
        let schema = schema();
        for state in schema.states() {
            let phase = state.phase().expect("every state carries a phase");
            assert!(
                PHASE_LABELS.iter().any(|(id, _)| *id == phase),
                "phase '{phase}' has no display label"
            );
        }
    }

    #[test]
    fn test_confirmations_present() {
        let schema = schema();
        for name in ["approve", "reject", "dispatch", "close_loan", "cancel"] {
            assert!(
                schema.transition(name).unwrap().confirmation().is_some(),
                "{name} should require confirmation"
            );
        }
        assert!(schema.transition("start_review").unwrap().confirmation().is_none());
    }
}
