//! The last engine exchanges, kept for test assertions.

use crate::EngineClientResult;
use alloy_rpc_types_engine::{
    ExecutionPayloadV1, ForkchoiceState, ForkchoiceUpdated, PayloadAttributes, PayloadStatus,
};

/// The parameters of a forkchoice update as they were sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkchoiceRequest {
    /// The forkchoice state.
    pub state: ForkchoiceState,
    /// The payload attributes, if the call asked the node to start building.
    pub payload_attributes: Option<PayloadAttributes>,
}

/// The most recent request and response of each remembered call kind.
///
/// Each slot is overwritten on every call of its kind, whether or not that call succeeded. A
/// failed call leaves the attempted request in place next to the error it produced. Recording a
/// request clears the response of its kind, so an attempt abandoned before it returned shows up
/// as a request with no response rather than next to the previous call's outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallMemory {
    /// The last forkchoice update sent.
    pub forkchoice_sent: Option<ForkchoiceRequest>,
    /// The outcome of the last forkchoice update.
    pub forkchoice_response: Option<EngineClientResult<ForkchoiceUpdated>>,
    /// The last payload submitted through new-payload.
    pub payload_sent: Option<ExecutionPayloadV1>,
    /// The outcome of the last new-payload call.
    pub payload_status_response: Option<EngineClientResult<PayloadStatus>>,
}

impl CallMemory {
    pub(crate) fn record_forkchoice_sent(
        &mut self,
        state: ForkchoiceState,
        payload_attributes: Option<PayloadAttributes>,
    ) {
        self.forkchoice_sent = Some(ForkchoiceRequest { state, payload_attributes });
        self.forkchoice_response = None;
    }

    pub(crate) fn record_forkchoice_response(
        &mut self,
        response: EngineClientResult<ForkchoiceUpdated>,
    ) {
        self.forkchoice_response = Some(response);
    }

    pub(crate) fn record_payload_sent(&mut self, payload: ExecutionPayloadV1) {
        self.payload_sent = Some(payload);
        self.payload_status_response = None;
    }

    pub(crate) fn record_payload_status(&mut self, response: EngineClientResult<PayloadStatus>) {
        self.payload_status_response = Some(response);
    }
}
