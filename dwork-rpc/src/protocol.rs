use std::fmt::{Display, Formatter};

use crate::net::{Status, WorkError};

#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The closed set of commands a node can send to a peer.
///
/// The discriminant of each variant is its opcode on the wire and must never
/// change. New commands are only ever appended to the end.
pub enum RequestKind {
    /// A node announces its id and reachable address. `(peer id, address)`
    Join = 0,
    /// A node leaves the cluster. `(peer id)`
    Leave = 1,
    /// Liveness probe.
    Ping = 2,
    /// Run a work unit, blocking until it completes. `(work unit)`
    DoWork = 3,
    /// Run a work unit, blocking until it has started. `(work unit)`
    StartWork = 4,
    /// Hand a work unit over without waiting for it. `(work unit)`
    ScheduleWork = 5,
    /// Query the free short-running slots of the receiver.
    GetShortRunningFree = 6,
    /// Query the free long-running slots of the receiver.
    GetLongRunningFree = 7,
    /// Push the sender's free short-running slots. `(peer id, count)`
    UpdateShortRunningFree = 8,
    /// Push the sender's free long-running slots. `(peer id, count)`
    UpdateLongRunningFree = 9,
    /// `(peer id)`
    DeltaDoWorkAccepted = 10,
    /// `(peer id)`
    DeltaDoWorkRejected = 11,
    /// `(peer id)`
    DeltaStartWorkAccepted = 12,
    /// `(peer id)`
    DeltaStartWorkRejected = 13,
    /// `(peer id)`
    DeltaScheduleWorkAccepted = 14,
    /// `(peer id)`
    DeltaScheduleWorkRejected = 15,
    /// `(peer id)`
    DeltaWorkSuccessful = 16,
    /// `(peer id)`
    DeltaWorkFailed = 17,
}

impl RequestKind {
    /// Every command, in opcode order.
    pub const ALL: [RequestKind; 18] = [
        RequestKind::Join,
        RequestKind::Leave,
        RequestKind::Ping,
        RequestKind::DoWork,
        RequestKind::StartWork,
        RequestKind::ScheduleWork,
        RequestKind::GetShortRunningFree,
        RequestKind::GetLongRunningFree,
        RequestKind::UpdateShortRunningFree,
        RequestKind::UpdateLongRunningFree,
        RequestKind::DeltaDoWorkAccepted,
        RequestKind::DeltaDoWorkRejected,
        RequestKind::DeltaStartWorkAccepted,
        RequestKind::DeltaStartWorkRejected,
        RequestKind::DeltaScheduleWorkAccepted,
        RequestKind::DeltaScheduleWorkRejected,
        RequestKind::DeltaWorkSuccessful,
        RequestKind::DeltaWorkFailed,
    ];

    #[inline]
    /// The wire opcode of the command.
    pub fn opcode(self) -> i32 {
        self as i32
    }

    /// Resolves a wire opcode back into a command.
    ///
    /// Returns `None` for opcodes this version does not know about.
    pub fn from_opcode(opcode: i32) -> Option<Self> {
        let idx = usize::try_from(opcode).ok()?;
        Self::ALL.get(idx).copied()
    }

    /// The number of argument values that follow the header.
    pub fn num_parameters(self) -> usize {
        match self {
            Self::Ping | Self::GetShortRunningFree | Self::GetLongRunningFree => 0,
            Self::Leave
            | Self::DoWork
            | Self::StartWork
            | Self::ScheduleWork
            | Self::DeltaDoWorkAccepted
            | Self::DeltaDoWorkRejected
            | Self::DeltaStartWorkAccepted
            | Self::DeltaStartWorkRejected
            | Self::DeltaScheduleWorkAccepted
            | Self::DeltaScheduleWorkRejected
            | Self::DeltaWorkSuccessful
            | Self::DeltaWorkFailed => 1,
            Self::Join | Self::UpdateShortRunningFree | Self::UpdateLongRunningFree => 2,
        }
    }

    /// The canonical upper-case name of the command.
    pub fn name(self) -> &'static str {
        match self {
            Self::Join => "JOIN",
            Self::Leave => "LEAVE",
            Self::Ping => "PING",
            Self::DoWork => "DO_WORK",
            Self::StartWork => "START_WORK",
            Self::ScheduleWork => "SCHEDULE_WORK",
            Self::GetShortRunningFree => "GET_SHORTRUNNING_FREE",
            Self::GetLongRunningFree => "GET_LONGRUNNING_FREE",
            Self::UpdateShortRunningFree => "UPDATE_SHORTRUNNING_FREE",
            Self::UpdateLongRunningFree => "UPDATE_LONGRUNNING_FREE",
            Self::DeltaDoWorkAccepted => "DELTA_DOWORK_ACCEPTED",
            Self::DeltaDoWorkRejected => "DELTA_DOWORK_REJECTED",
            Self::DeltaStartWorkAccepted => "DELTA_STARTWORK_ACCEPTED",
            Self::DeltaStartWorkRejected => "DELTA_STARTWORK_REJECTED",
            Self::DeltaScheduleWorkAccepted => "DELTA_SCHEDULEWORK_ACCEPTED",
            Self::DeltaScheduleWorkRejected => "DELTA_SCHEDULEWORK_REJECTED",
            Self::DeltaWorkSuccessful => "DELTA_WORK_SUCCESSFUL",
            Self::DeltaWorkFailed => "DELTA_WORK_FAILED",
        }
    }
}

impl Display for RequestKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[repr(i32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
/// The closed set of response kinds.
///
/// As with [RequestKind], discriminants are wire opcodes.
pub enum ResponseKind {
    /// Success with no value.
    VoidOk = 0,
    /// Success carrying a single `i64`.
    LongOk = 1,
    /// A [WorkError] raised by the remote work executor.
    WorkError = 2,
    /// Any other failure, carried as a [Status].
    GenericError = 3,
}

impl ResponseKind {
    /// Every response kind, in opcode order.
    pub const ALL: [ResponseKind; 4] = [
        ResponseKind::VoidOk,
        ResponseKind::LongOk,
        ResponseKind::WorkError,
        ResponseKind::GenericError,
    ];

    #[inline]
    pub fn opcode(self) -> i32 {
        self as i32
    }

    pub fn from_opcode(opcode: i32) -> Option<Self> {
        let idx = usize::try_from(opcode).ok()?;
        Self::ALL.get(idx).copied()
    }

    pub fn num_parameters(self) -> usize {
        match self {
            Self::VoidOk => 0,
            Self::LongOk | Self::WorkError | Self::GenericError => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// A decoded response frame.
pub enum Response {
    VoidOk,
    LongOk(i64),
    WorkError(WorkError),
    GenericError(Status),
}

impl Response {
    #[inline]
    pub fn kind(&self) -> ResponseKind {
        match self {
            Self::VoidOk => ResponseKind::VoidOk,
            Self::LongOk(_) => ResponseKind::LongOk,
            Self::WorkError(_) => ResponseKind::WorkError,
            Self::GenericError(_) => ResponseKind::GenericError,
        }
    }
}
