use crate::{
    datatypes::Outlet,
    error::{Error, Result},
};

pub trait Switch {
    /// Send an on or off command to an outlet
    fn set_outlet_state(&self, index: usize, on: bool) -> Result<()>;

    /// Outlets as of the last load
    fn outlets(&self) -> Result<&[Outlet]>;

    /// Cached state of an outlet
    fn is_on(&self, index: usize) -> Result<bool> {
        self.outlets()?
            .iter()
            .find(|outlet| outlet.index == index)
            .map(|outlet| outlet.on)
            .ok_or(Error::OutOfRange(index))
    }

    fn is_off(&self, index: usize) -> Result<bool> {
        Ok(!self.is_on(index)?)
    }

    fn switch_on(&self, index: usize) -> Result<()> {
        self.set_outlet_state(index, true)
    }

    fn switch_off(&self, index: usize) -> Result<()> {
        self.set_outlet_state(index, false)
    }

    /// Flip an outlet based on its cached state, returning the requested state
    fn toggle(&self, index: usize) -> Result<bool> {
        if self.is_on(index)? {
            self.switch_off(index)?;
            Ok(false)
        } else {
            self.switch_on(index)?;
            Ok(true)
        }
    }
}
