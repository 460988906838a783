//! Grid map owned by a bot session

/// One cell of the arena grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Tile {
    #[default]
    Empty = 0,
    TeamA = 1,
    TeamB = 2,
    Wall = 3,
}

impl Tile {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Empty),
            1 => Some(Self::TeamA),
            2 => Some(Self::TeamB),
            3 => Some(Self::Wall),
            _ => None,
        }
    }

    pub fn is_wall(self) -> bool {
        self == Self::Wall
    }
}

/// Integer grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Cell containing a continuous position
    pub fn containing(x: f32, y: f32) -> Self {
        Self {
            x: x.floor() as i32,
            y: y.floor() as i32,
        }
    }

    /// Continuous coordinates of the cell center
    pub fn center(self) -> (f32, f32) {
        (self.x as f32 + 0.5, self.y as f32 + 0.5)
    }
}

/// Sparse map update carried by a `Shot` message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellUpdate {
    pub x: i32,
    pub y: i32,
    pub tile: Tile,
}

/// Map errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("map declares {width}x{height} but carries {actual} tiles")]
    SizeMismatch { width: i32, height: i32, actual: usize },

    #[error("cell ({x}, {y}) is outside the {width}x{height} map")]
    CellOutOfBounds { x: i32, y: i32, width: i32, height: i32 },
}

/// Row-major tile grid. `tiles.len() == width * height` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameMap {
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
}

impl GameMap {
    pub fn new(width: i32, height: i32, tiles: Vec<Tile>) -> Result<Self, MapError> {
        let expected = if width < 0 || height < 0 {
            None
        } else {
            (width as usize).checked_mul(height as usize)
        };
        if expected != Some(tiles.len()) {
            return Err(MapError::SizeMismatch {
                width,
                height,
                actual: tiles.len(),
            });
        }
        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Map where every cell holds the same tile
    pub fn filled(width: i32, height: i32, tile: Tile) -> Self {
        let len = (width.max(0) as usize) * (height.max(0) as usize);
        Self {
            width: width.max(0),
            height: height.max(0),
            tiles: vec![tile; len],
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width && y < self.height
    }

    /// Flattened index `x + y * width`, if the cell is on the map
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(x as usize + y as usize * self.width as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Tile> {
        self.index(x, y).map(|idx| self.tiles[idx])
    }

    pub fn get_cell(&self, cell: Cell) -> Option<Tile> {
        self.get(cell.x, cell.y)
    }

    /// In bounds and not a wall
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        matches!(self.get(x, y), Some(tile) if !tile.is_wall())
    }

    pub fn set(&mut self, x: i32, y: i32, tile: Tile) -> Result<(), MapError> {
        let idx = self.index(x, y).ok_or(MapError::CellOutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        })?;
        self.tiles[idx] = tile;
        Ok(())
    }

    /// Apply a sparse patch. Every cell is validated first; a patch with any
    /// out-of-bounds cell leaves the map untouched.
    pub fn apply_patch(&mut self, cells: &[CellUpdate]) -> Result<(), MapError> {
        if let Some(bad) = cells.iter().find(|c| !self.in_bounds(c.x, c.y)) {
            return Err(MapError::CellOutOfBounds {
                x: bad.x,
                y: bad.y,
                width: self.width,
                height: self.height,
            });
        }
        for cell in cells {
            let idx = cell.x as usize + cell.y as usize * self.width as usize;
            self.tiles[idx] = cell.tile;
        }
        Ok(())
    }
}
