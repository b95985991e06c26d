use karai_core::trace;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Core,
    Protocol,
    Network,
    Rpc,
    Commands,
}

impl Component {
    pub const ALL: [Component; 5] = [Component::Core, Component::Protocol, Component::Network, Component::Rpc, Component::Commands];

    fn index(self) -> usize {
        self as usize
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Component::Core => "core",
            Component::Protocol => "protocol handler",
            Component::Network => "p2p server",
            Component::Rpc => "rpc server",
            Component::Commands => "console",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ComponentState {
    #[default]
    Unconstructed,
    Constructed,
    /// Wired to a peer component (the protocol handler to the p2p endpoint)
    Attached,
    Started,
    Stopped,
    Detached,
}

/// Lifecycle position of every node component
#[derive(Debug, Default)]
pub struct ComponentStates([ComponentState; Component::ALL.len()]);

impl ComponentStates {
    pub fn get(&self, component: Component) -> ComponentState {
        self.0[component.index()]
    }

    pub fn set(&mut self, component: Component, state: ComponentState) {
        trace!("{} state: {:?} -> {:?}", component, self.0[component.index()], state);
        self.0[component.index()] = state;
    }

    /// Moves `component` to `to` if it currently is in `from`. Returns whether it moved.
    pub fn transition(&mut self, component: Component, from: ComponentState, to: ComponentState) -> bool {
        if self.get(component) != from {
            return false;
        }
        self.set(component, to);
        true
    }
}
