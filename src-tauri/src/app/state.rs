use crate::app::panel::Panel;

pub struct AppState {
    pub panel: Panel,
}

impl AppState {
    pub fn new(panel: Panel) -> Self {
        Self { panel }
    }
}
