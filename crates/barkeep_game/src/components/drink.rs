//! Drinks and recipes.

use serde::{Deserialize, Serialize};

/// Something that can be poured into a drink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ingredient {
    /// Cola from the soda spout.
    Soda,
    /// Rum.
    Rum,
    /// Tequila.
    Tequila,
    /// Vodka.
    Vodka,
    /// Lime juice.
    LimeJuice,
    /// Lemon juice.
    LemonJuice,
    /// Simple syrup.
    SimpleSyrup,
    /// Ice.
    Ice,
}

/// A known recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Drink {
    /// Soda.
    Coke,
    /// Rum and soda.
    RumAndCoke,
    /// Tequila, lime and syrup.
    Margarita,
    /// Rum, lime, syrup and soda.
    Mojito,
    /// Vodka, lemon and syrup.
    Lemondrop,
}

impl Drink {
    /// Every recipe.
    pub const ALL: [Drink; 5] = [
        Drink::Coke,
        Drink::RumAndCoke,
        Drink::Margarita,
        Drink::Mojito,
        Drink::Lemondrop,
    ];

    /// Ingredients the recipe needs, sorted.
    #[must_use]
    pub fn ingredients(self) -> &'static [Ingredient] {
        use Ingredient::*;
        match self {
            Drink::Coke => &[Soda],
            Drink::RumAndCoke => &[Soda, Rum],
            Drink::Margarita => &[Tequila, LimeJuice, SimpleSyrup],
            Drink::Mojito => &[Soda, Rum, LimeJuice, SimpleSyrup],
            Drink::Lemondrop => &[Vodka, LemonJuice, SimpleSyrup],
        }
    }

    /// Coins a customer pays for it.
    #[must_use]
    pub fn price(self) -> i32 {
        5 * self.ingredients().len() as i32
    }
}

/// A cup and its contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsDrink {
    ingredients: Vec<Ingredient>,
}

impl IsDrink {
    /// Adds an ingredient. Duplicates are ignored.
    pub fn add_ingredient(&mut self, ingredient: Ingredient) {
        if let Err(at) = self.ingredients.binary_search(&ingredient) {
            self.ingredients.insert(at, ingredient);
        }
    }

    /// Returns `true` if the ingredient is in the cup.
    #[must_use]
    pub fn has_ingredient(&self, ingredient: Ingredient) -> bool {
        self.ingredients.binary_search(&ingredient).is_ok()
    }

    /// Returns `true` when the cup holds exactly the recipe's ingredients.
    /// Ice never affects the match.
    #[must_use]
    pub fn matches_recipe(&self, drink: Drink) -> bool {
        let mut wanted = drink.ingredients().to_vec();
        wanted.sort_unstable();
        let poured: Vec<Ingredient> = self
            .ingredients
            .iter()
            .copied()
            .filter(|i| *i != Ingredient::Ice)
            .collect();
        poured == wanted
    }

    /// The first recipe the contents match.
    #[must_use]
    pub fn recipe(&self) -> Option<Drink> {
        Drink::ALL.into_iter().find(|d| self.matches_recipe(*d))
    }

    /// Empties the cup.
    pub fn clear(&mut self) {
        self.ingredients.clear();
    }
}

component!(IsDrink);
