use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::rc::{Rc, Weak};

use winit::event::ElementState;
pub use winit::keyboard::KeyCode;

/// One of the four movement directions a key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Maps logical actions (defined by the game) to one or more physical keys.
#[derive(Debug, Clone)]
pub struct ActionMap<A: Hash + Eq + Copy> {
    bindings: HashMap<A, Vec<KeyCode>>,
}

impl<A: Hash + Eq + Copy> ActionMap<A> {
    pub fn new() -> Self {
        Self { bindings: HashMap::new() }
    }

    pub fn bind(&mut self, action: A, key: KeyCode) {
        self.bindings.entry(action).or_insert_with(Vec::new).push(key);
    }

    /// Returns true if any key bound to `action` is in `held`.
    pub fn is_held(&self, action: A, held: &HashSet<KeyCode>) -> bool {
        self.bindings
            .get(&action)
            .map_or(false, |keys| keys.iter().any(|k| held.contains(k)))
    }
}

impl<A: Hash + Eq + Copy> Default for ActionMap<A> {
    fn default() -> Self { Self::new() }
}

/// Arrow keys plus W/A/S/D.
///
/// Bindings use physical key codes, so they are independent of Shift and
/// Caps Lock.
pub fn movement_bindings() -> ActionMap<Direction> {
    let mut map = ActionMap::new();
    map.bind(Direction::Up, KeyCode::ArrowUp);
    map.bind(Direction::Up, KeyCode::KeyW);
    map.bind(Direction::Down, KeyCode::ArrowDown);
    map.bind(Direction::Down, KeyCode::KeyS);
    map.bind(Direction::Left, KeyCode::ArrowLeft);
    map.bind(Direction::Left, KeyCode::KeyA);
    map.bind(Direction::Right, KeyCode::ArrowRight);
    map.bind(Direction::Right, KeyCode::KeyD);
    map
}

// ── KeyboardHub ──────────────────────────────────────────────────────────────

type HeldKeys = Rc<RefCell<HashSet<KeyCode>>>;
type Listeners = Rc<RefCell<Vec<HeldKeys>>>;

/// Per-window keyboard dispatcher.
///
/// The window's event handler forwards raw key signals here; every attached
/// [`InputCapture`] sees them until it is released. Hubs are plain values, so
/// two hubs (e.g. two tests) never share listeners.
#[derive(Default)]
pub struct KeyboardHub {
    listeners: Listeners,
}

impl KeyboardHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new capture with the default movement bindings.
    pub fn attach(&self) -> InputCapture {
        self.attach_with(movement_bindings())
    }

    pub fn attach_with(&self, bindings: ActionMap<Direction>) -> InputCapture {
        let keys: HeldKeys = Rc::new(RefCell::new(HashSet::new()));
        self.listeners.borrow_mut().push(Rc::clone(&keys));
        InputCapture {
            hub: Rc::downgrade(&self.listeners),
            keys,
            bindings,
            attached: true,
        }
    }

    pub fn key_down(&self, key: KeyCode) {
        for keys in self.listeners.borrow().iter() {
            keys.borrow_mut().insert(key);
        }
    }

    pub fn key_up(&self, key: KeyCode) {
        for keys in self.listeners.borrow().iter() {
            keys.borrow_mut().remove(&key);
        }
    }

    /// Forward a winit key transition.
    pub fn dispatch(&self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => self.key_down(key),
            ElementState::Released => self.key_up(key),
        }
    }

    /// Number of captures currently attached.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }
}

// ── InputCapture ─────────────────────────────────────────────────────────────

/// Owned handle onto a [`KeyboardHub`]'s key stream.
///
/// Detaches on [`release`](Self::release) or drop, whichever comes first.
pub struct InputCapture {
    hub: Weak<RefCell<Vec<HeldKeys>>>,
    keys: HeldKeys,
    bindings: ActionMap<Direction>,
    attached: bool,
}

impl InputCapture {
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys.borrow().contains(&key)
    }

    pub fn is_held(&self, direction: Direction) -> bool {
        self.bindings.is_held(direction, &self.keys.borrow())
    }

    /// Instantaneous movement direction as `(dx, dy)`, each in `{-1, 0, 1}`.
    ///
    /// Up wins over Down and Left wins over Right; the axes are independent,
    /// so diagonals are possible.
    pub fn poll_direction(&self) -> (i32, i32) {
        let dy = if self.is_held(Direction::Up) {
            -1
        } else if self.is_held(Direction::Down) {
            1
        } else {
            0
        };
        let dx = if self.is_held(Direction::Left) {
            -1
        } else if self.is_held(Direction::Right) {
            1
        } else {
            0
        };
        (dx, dy)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Detach from the hub and forget all held keys. Idempotent.
    pub fn release(&mut self) {
        if !self.attached {
            return;
        }
        self.attached = false;
        if let Some(listeners) = self.hub.upgrade() {
            listeners.borrow_mut().retain(|keys| !Rc::ptr_eq(keys, &self.keys));
        }
        self.keys.borrow_mut().clear();
    }
}

impl Drop for InputCapture {
    fn drop(&mut self) {
        self.release();
    }
}
